use super::client::{build_client, post_json};
use super::models::StructuredRequestBody;
use super::response::extract_structured;
use super::{StructuredModel, StructuredRequest};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Instant;

/// OpenAI-compatible chat completions endpoint with JSON-schema output.
pub struct ChatCompletionsModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl ChatCompletionsModel {
    pub fn new(api_key: &str, endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(api_key)?,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl StructuredModel for ChatCompletionsModel {
    async fn complete(&self, request: &StructuredRequest) -> Result<Value> {
        let body = StructuredRequestBody {
            model: self.model.clone(),
            messages: request.messages.clone(),
            stream: false,
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "strict": true,
                    "schema": request.schema,
                }
            }),
        };

        let start = Instant::now();
        let response = post_json(&self.client, &self.endpoint, &body).await?;
        let response_json: Value = response.json().await?;
        tracing::info!(
            model = %self.model,
            duration_ms = %start.elapsed().as_millis(),
            "structured completion finished"
        );

        extract_structured(&response_json)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
