use super::defaults::{default_component_key_env, default_max_num_results};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub stream_timeout: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComponentConfig {
    #[serde(default = "default_component_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Name of the environment variable holding the key, never the key itself.
    #[serde(default = "default_component_key_env")]
    pub api_key_env: String,
}

fn default_component_enabled() -> bool {
    true
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            enabled: default_component_enabled(),
            endpoint: None,
            model: None,
            api_key_env: default_component_key_env(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub vector_store_id: Option<String>,
    #[serde(default = "default_max_num_results")]
    pub max_num_results: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_store_id: None,
            max_num_results: default_max_num_results(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LimitsConfig {
    #[serde(default)]
    pub max_round_trips: Option<u32>,
    #[serde(default)]
    pub max_turns: Option<u32>,
    #[serde(default)]
    pub max_images: Option<usize>,
    #[serde(default)]
    pub max_response_chars: Option<usize>,
    /// Seconds.
    #[serde(default)]
    pub turn_timeout: Option<u64>,
    #[serde(default)]
    pub retry_attempts: Option<u32>,
}

/// Normalize a base URL or full URL to the given API path, e.g. `/chat/completions`.
pub fn normalize_endpoint(endpoint: &str, path: &str) -> String {
    if endpoint.ends_with(path) {
        endpoint.to_string()
    } else if endpoint.ends_with("/v1") {
        format!("{}{}", endpoint, path)
    } else if endpoint.ends_with("/v1/") {
        format!("{}{}", endpoint.trim_end_matches('/'), path)
    } else {
        // Assume it's a base URL without /v1
        format!("{}/v1{}", endpoint.trim_end_matches('/'), path)
    }
}
