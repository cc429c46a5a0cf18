mod api;
mod defaults;
mod prompt;
mod validation;

use crate::cli::Args;
use crate::error::{ChatError, Result};
use crate::models::{Settings, FILE_SEARCH_TOOL};
use crate::orchestrator::TurnLimits;
use crate::retry::RetryPolicy;
use crate::tools::{Retrieval, COMPONENT_TOOL};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub use api::{normalize_endpoint, ApiConfig, ComponentConfig, LimitsConfig, RetrievalConfig};
pub use defaults::*;
pub use prompt::{PromptTemplate, Starter};
pub use validation::{expand_env_var_in_string, parse_flag};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PromptConfig {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub component: ComponentConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Connection details for the component-generation model.
#[derive(Debug, Clone)]
pub struct ComponentSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
}

pub struct Config {
    pub api_key: String,
    pub api_endpoint: String,
    pub stream_timeout: u64,
    pub verbose: bool,
    pub settings: Settings,
    pub component: Option<ComponentSettings>,
    pub retrieval: Option<Retrieval>,
    pub limits: TurnLimits,
    pub max_response_chars: Option<usize>,
    pub prompt: Option<PromptTemplate>,
    /// Tools bound to new conversations.
    pub tools: Vec<String>,
}

impl Config {
    pub fn from_env_and_args(args: &Args) -> Result<Self> {
        // Load file configuration first
        let file_config = FileConfig::load()?;

        // API key is only ever read from the environment
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ChatError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        // Endpoint: CLI args > env var > config file > default
        let api_endpoint = args
            .api_endpoint
            .clone()
            .or_else(|| env::var("DOCBOT_API_ENDPOINT").ok())
            .or(file_config.api.endpoint.clone())
            .map(|endpoint| normalize_endpoint(&endpoint, "/responses"))
            .unwrap_or_else(|| DEFAULT_RESPONSES_ENDPOINT.to_string());

        let stream_timeout = env::var("DOCBOT_STREAM_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .or(file_config.api.stream_timeout)
            .unwrap_or_else(default_stream_timeout);

        let verbose = args.verbose
            || env::var("DOCBOT_VERBOSE")
                .ok()
                .map(|v| parse_flag(&v))
                .or(file_config.session.verbose)
                .unwrap_or(false);

        let prompt = args
            .prompt
            .clone()
            .or_else(|| env::var("DOCBOT_PROMPT_PATH").ok().map(PathBuf::from))
            .or_else(|| {
                file_config
                    .prompt
                    .path
                    .as_deref()
                    .map(|p| PathBuf::from(expand_env_var_in_string(p)))
            })
            .map(|path| PromptTemplate::load(&path))
            .transpose()?;

        let settings = Self::build_settings(args, &file_config, prompt.as_ref())?;
        let retrieval = Self::build_retrieval(&file_config.retrieval);
        let component = Self::build_component(&file_config.component);
        let limits = Self::build_limits(args, &file_config.limits);

        let max_response_chars = args
            .max_chars
            .or(if args.platform_cap {
                Some(PLATFORM_MAX_CHARS)
            } else {
                None
            })
            .or(file_config.limits.max_response_chars);

        let tools = if args.no_tools {
            Vec::new()
        } else if let Some(tools) = prompt.as_ref().and_then(|p| p.tools.clone()) {
            tools
        } else {
            let mut tools = Vec::new();
            if retrieval.is_some() {
                tools.push(FILE_SEARCH_TOOL.to_string());
            }
            if component.is_some() {
                tools.push(COMPONENT_TOOL.to_string());
            }
            tools
        };

        Ok(Config {
            api_key,
            api_endpoint,
            stream_timeout,
            verbose,
            settings,
            component,
            retrieval,
            limits,
            max_response_chars,
            prompt,
            tools,
        })
    }

    fn build_settings(
        args: &Args,
        file_config: &FileConfig,
        prompt: Option<&PromptTemplate>,
    ) -> Result<Settings> {
        let mut settings = Settings::new(
            file_config
                .model
                .default_model
                .clone()
                .unwrap_or_else(default_model),
        );
        settings.temperature = file_config.model.temperature;
        settings.max_output_tokens = file_config.model.max_output_tokens;

        if let Some(prompt) = prompt {
            settings = prompt.apply_settings(settings)?;
        }

        // Model override: CLI > env var > prompt/config
        if let Some(model) = args.model.clone().or_else(|| env::var("DOCBOT_MODEL").ok()) {
            settings.model = model;
        }

        if args.platform_cap && settings.max_output_tokens.is_none() {
            settings.max_output_tokens = Some(PLATFORM_MAX_OUTPUT_TOKENS);
        }

        Ok(settings)
    }

    fn build_retrieval(config: &RetrievalConfig) -> Option<Retrieval> {
        env::var("OPENAI_VECTOR_STORE_ID")
            .ok()
            .or(config.vector_store_id.clone())
            .filter(|id| !id.is_empty())
            .map(|id| Retrieval {
                vector_store_ids: vec![id],
                max_num_results: config.max_num_results,
            })
    }

    fn build_component(config: &ComponentConfig) -> Option<ComponentSettings> {
        if !config.enabled {
            return None;
        }
        let api_key = env::var(&config.api_key_env)
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .ok()?;

        let endpoint = env::var("DOCBOT_COMPONENT_ENDPOINT")
            .ok()
            .or(config.endpoint.clone())
            .map(|e| normalize_endpoint(&e, "/chat/completions"))
            .unwrap_or_else(|| DEFAULT_COMPONENT_ENDPOINT.to_string());

        let model = env::var("DOCBOT_COMPONENT_MODEL")
            .ok()
            .or(config.model.clone())
            .unwrap_or_else(default_component_model);

        Some(ComponentSettings {
            endpoint,
            model,
            api_key,
        })
    }

    fn build_limits(args: &Args, config: &LimitsConfig) -> TurnLimits {
        let max_turns = args.max_turns.or_else(|| {
            env::var("DOCBOT_MAX_TURNS")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .or(config.max_turns)
        });

        TurnLimits {
            max_round_trips: config
                .max_round_trips
                .unwrap_or_else(default_max_round_trips),
            max_turns,
            max_images: config.max_images.unwrap_or_else(default_max_images),
            turn_timeout: config.turn_timeout.map(Duration::from_secs),
            retry: RetryPolicy::with_attempts(
                config
                    .retry_attempts
                    .unwrap_or_else(default_retry_attempts),
            ),
        }
    }
}

impl FileConfig {
    pub fn load() -> anyhow::Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        // No config file found, return default
        Ok(FileConfig::default())
    }

    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            serde_yaml::from_str(&contents).with_context(|| {
                format!("Failed to parse YAML config file: {}", path.display())
            })?
        } else {
            serde_json::from_str(&contents).with_context(|| {
                format!("Failed to parse JSON config file: {}", path.display())
            })?
        };

        Ok(config)
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            // 1. Current directory (local override)
            PathBuf::from(".docbot.yaml"),
            PathBuf::from(".docbot.yml"),
            PathBuf::from(".docbot.json"),
        ];

        // 2. User's config directory (global config)
        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("docbot");
            paths.push(config_dir.join("docbot.yaml"));
            paths.push(config_dir.join("docbot.yml"));
            paths.push(config_dir.join("docbot.json"));
        }

        paths
    }
}
