use super::client::{build_client, post_json};
use super::models::RequestBody;
use super::streaming::{event_stream, EventStream};
use super::ModelInvocation;
use crate::error::Result;
use crate::models::{Message, Settings, ToolDefinition};
use async_trait::async_trait;

/// Streaming client for the OpenAI Responses API.
pub struct ResponsesModel {
    client: reqwest::Client,
    endpoint: String,
    stream_timeout: u64,
}

impl ResponsesModel {
    pub fn new(api_key: &str, endpoint: impl Into<String>, stream_timeout: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(api_key)?,
            endpoint: endpoint.into(),
            stream_timeout,
        })
    }
}

#[async_trait]
impl ModelInvocation for ResponsesModel {
    async fn invoke(
        &self,
        history: &[Message],
        settings: &Settings,
        tools: &[ToolDefinition],
    ) -> Result<EventStream> {
        let body = RequestBody::new(history, settings, tools);
        tracing::debug!(
            model = %body.model,
            input_items = body.input.len(),
            tools = body.tools.len(),
            "invoking model"
        );

        let response = post_json(&self.client, &self.endpoint, &body).await?;
        Ok(event_stream(response, self.stream_timeout))
    }
}
