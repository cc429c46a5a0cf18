use crate::models::{Message, Role, Settings};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Suggested first messages shown when a conversation starts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Starter {
    pub label: String,
    pub message: String,
}

/// Prompt file: template messages, model settings and bound tools.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    pub name: String,
    pub template_messages: Vec<Message>,
    /// Settings exactly as written, minus the `provider` key.
    pub settings: Map<String, Value>,
    pub tools: Option<Vec<String>>,
    pub starters: Vec<Starter>,
}

#[derive(Deserialize)]
struct RawPrompt {
    #[serde(default)]
    name: String,
    #[serde(default)]
    template_messages: Vec<RawMessage>,
    #[serde(default)]
    settings: Map<String, Value>,
    #[serde(default)]
    tools: Option<Vec<Value>>,
    #[serde(default)]
    starters: Vec<Starter>,
}

#[derive(Deserialize)]
struct RawMessage {
    role: Role,
    content: Value,
}

impl PromptTemplate {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse prompt file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let raw: RawPrompt = serde_json::from_str(contents)?;

        let template_messages = raw
            .template_messages
            .into_iter()
            .map(|m| Message::text(m.role, content_text(&m.content)))
            .collect();

        let mut settings = raw.settings;
        settings.remove("provider");

        let tools = raw
            .tools
            .map(|tools| tools.iter().filter_map(tool_name).collect());

        Ok(Self {
            name: raw.name,
            template_messages,
            settings,
            tools,
            starters: raw.starters,
        })
    }

    /// Layer the prompt's settings over `base`. Keys the model settings know
    /// are typed, everything else is forwarded as a provider knob.
    pub fn apply_settings(&self, base: Settings) -> Result<Settings> {
        let mut merged = serde_json::to_value(&base)?;
        if let Value::Object(map) = &mut merged {
            for (key, value) in &self.settings {
                map.insert(key.clone(), value.clone());
            }
        }
        Ok(serde_json::from_value(merged)?)
    }
}

fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Tools may be listed by name or as provider tool objects.
fn tool_name(tool: &Value) -> Option<String> {
    match tool {
        Value::String(name) => Some(name.clone()),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("type"))
            .and_then(|n| n.as_str())
            .map(|n| n.to_string()),
        _ => None,
    }
}
