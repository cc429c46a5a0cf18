use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Unsupported tool: {name}")]
    UnsupportedTool { name: String },

    #[error("Tool '{name}' failed after {attempts} attempt(s): {message}")]
    ToolInvocationFailure {
        name: String,
        attempts: u32,
        message: String,
    },

    #[error("Tool '{name}' returned a malformed result: {message}")]
    ToolResultMalformed { name: String, message: String },

    #[error("Invalid arguments for tool '{name}': {message}")]
    InvalidToolArguments { name: String, message: String },

    #[error(
        "Model stream ended with {open_tool_calls} open tool call(s) and {open_messages} open message(s)"
    )]
    IncompleteTurn {
        open_tool_calls: usize,
        open_messages: usize,
    },

    #[error("Conversation limit of {limit} turn(s) reached")]
    TurnLimitExceeded { limit: u32 },

    #[error("Response of {length} characters exceeds the {limit} character limit")]
    ResponseTooLong { length: usize, limit: usize },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl ChatError {
    /// Errors a retry can plausibly fix: the request never got a usable answer.
    pub fn is_transport(&self) -> bool {
        match self {
            ChatError::Network(_) | ChatError::Timeout => true,
            ChatError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether the failure is scoped to a single tool call and the turn may continue.
    pub fn is_contained_to_tool(&self) -> bool {
        matches!(
            self,
            ChatError::ToolInvocationFailure { .. }
                | ChatError::ToolResultMalformed { .. }
                | ChatError::InvalidToolArguments { .. }
        )
    }

    /// Text placed in a tool-role message when a tool call fails inline.
    pub fn tool_output(&self) -> String {
        format!("Error: {}", self)
    }
}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        ChatError::Config(format!("{:#}", err))
    }
}

impl From<String> for ChatError {
    fn from(msg: String) -> Self {
        ChatError::Other(msg)
    }
}

impl From<&str> for ChatError {
    fn from(msg: &str) -> Self {
        ChatError::Other(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
