use super::message::Message;
use super::tool::Artifact;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Model settings for the primary invocation. Unknown keys are forwarded
/// to the provider untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub turns_used: u32,
    pub message_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Local>,
    pub last_updated: DateTime<Local>,
    pub messages: Vec<Message>,
    pub settings: Settings,
    /// Names of the tools bound to this conversation.
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub counters: Counters,
    /// Only the most recent generation is kept as context for the next one.
    #[serde(default)]
    pub last_artifact: Option<Artifact>,
}

impl Session {
    pub fn new(session_id: impl Into<String>, settings: Settings) -> Self {
        let now = Local::now();
        Self {
            session_id: session_id.into(),
            created_at: now,
            last_updated: now,
            messages: Vec::new(),
            settings,
            tools: Vec::new(),
            counters: Counters::default(),
            last_artifact: None,
        }
    }

    /// Append a sealed message. History is append-only.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.counters.message_count = self.messages.len() as u32;
        self.last_updated = Local::now();
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }
}
