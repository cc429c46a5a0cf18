//! Model providers.
//!
//! The turn controller only sees the two traits below; the HTTP clients for
//! the OpenAI Responses API and OpenAI-compatible chat completions live in
//! the submodules.

pub mod client;
pub mod completions;
pub mod models;
pub mod openai;
pub mod response;
pub mod streaming;

pub use client::{build_client, post_json};
pub use completions::ChatCompletionsModel;
pub use models::{ChatMessage, RequestBody};
pub use openai::ResponsesModel;
pub use streaming::{decode_stream, event_stream, EventStream};

use crate::error::Result;
use crate::models::{Message, Settings, ToolDefinition};
use async_trait::async_trait;
use serde_json::Value;

/// Streaming invocation of the primary model.
#[async_trait]
pub trait ModelInvocation: Send + Sync {
    async fn invoke(
        &self,
        history: &[Message],
        settings: &Settings,
        tools: &[ToolDefinition],
    ) -> Result<EventStream>;
}

/// A request for a JSON object matching `schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRequest {
    pub messages: Vec<ChatMessage>,
    pub schema_name: String,
    pub schema: Value,
}

/// Non-streaming structured-output invocation, used inside tools.
#[async_trait]
pub trait StructuredModel: Send + Sync {
    async fn complete(&self, request: &StructuredRequest) -> Result<Value>;

    fn model_id(&self) -> &str;
}
