//! UI component generation, backed by a second structured-output model.

use super::registry::{ToolContext, ToolHandler, ToolOutput};
use crate::api::{ChatMessage, StructuredModel, StructuredRequest};
use crate::error::{ChatError, Result};
use crate::models::{Artifact, Role};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const COMPONENT_TOOL: &str = "generate_component";

const SYSTEM_PROMPT: &str = "You write a single self-contained React function component in JSX. \
Use Tailwind classes for styling and no imports other than React. \
Return the component name, its full source code, and the props to render it with \
as a JSON-encoded object string.";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ComponentRequest {
    pub query: String,
}

pub struct ComponentTool {
    model: Arc<dyn StructuredModel>,
    retry: RetryPolicy,
}

impl ComponentTool {
    pub fn new(model: Arc<dyn StructuredModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    fn build_request(request: &ComponentRequest, previous: Option<&Artifact>) -> StructuredRequest {
        let mut messages = vec![ChatMessage::new(Role::System, SYSTEM_PROMPT)];
        if let Some(previous) = previous {
            messages.push(ChatMessage::new(
                Role::User,
                format!(
                    "Previous iteration, component `{}`:\n```jsx\n{}\n```\nProps: {}",
                    previous.name, previous.source_code, previous.props
                ),
            ));
        }
        messages.push(ChatMessage::new(Role::User, request.query.clone()));

        StructuredRequest {
            messages,
            schema_name: "component".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "sourceCode": { "type": "string" },
                    "props": { "type": "string", "description": "JSON-encoded props object" }
                },
                "required": ["name", "sourceCode", "props"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for ComponentTool {
    fn name(&self) -> &str {
        COMPONENT_TOOL
    }

    fn description(&self) -> &str {
        "Generate a React UI component from a description and show it to the user. \
         Send the full request, including any change to the previous component."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What the component should look like and do"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn call(&self, arguments: &Value, ctx: &mut ToolContext<'_>) -> Result<ToolOutput> {
        let request: ComponentRequest =
            serde_json::from_value(arguments.clone()).map_err(|e| ChatError::InvalidToolArguments {
                name: COMPONENT_TOOL.to_string(),
                message: e.to_string(),
            })?;

        let structured = Self::build_request(&request, ctx.last_artifact.as_ref());
        tracing::debug!(
            model = self.model.model_id(),
            has_previous = ctx.last_artifact.is_some(),
            "generating component"
        );

        let raw = self
            .retry
            .run(COMPONENT_TOOL, |_| self.model.complete(&structured))
            .await
            .map_err(|exhausted| match exhausted.error {
                ChatError::Json(e) => ChatError::ToolResultMalformed {
                    name: COMPONENT_TOOL.to_string(),
                    message: e.to_string(),
                },
                other => ChatError::ToolInvocationFailure {
                    name: COMPONENT_TOOL.to_string(),
                    attempts: exhausted.attempts,
                    message: other.to_string(),
                },
            })?;

        let artifact = normalize_artifact(raw).map_err(|message| ChatError::ToolResultMalformed {
            name: COMPONENT_TOOL.to_string(),
            message,
        })?;

        *ctx.last_artifact = Some(artifact.clone());

        let content = json!({
            "status": "rendered",
            "name": artifact.name,
            "note": "The component is now displayed to the user with a preview and a code tab. \
                     Do not repeat its source code in your answer; briefly describe what was built instead."
        })
        .to_string();

        Ok(ToolOutput {
            content,
            artifact: Some(artifact),
        })
    }
}

/// Turn the model's object into an artifact. Props may arrive either as an
/// object or as a JSON-encoded string.
pub fn normalize_artifact(raw: Value) -> std::result::Result<Artifact, String> {
    let name = raw
        .get("name")
        .and_then(|n| n.as_str())
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| "missing component name".to_string())?
        .to_string();

    let source_code = raw
        .get("sourceCode")
        .or_else(|| raw.get("source_code"))
        .and_then(|s| s.as_str())
        .ok_or_else(|| "missing source code".to_string())?
        .to_string();

    let props = match raw.get("props") {
        None | Some(Value::Null) => json!({}),
        Some(Value::String(encoded)) if encoded.trim().is_empty() => json!({}),
        Some(Value::String(encoded)) => serde_json::from_str(encoded)
            .map_err(|e| format!("props is not valid JSON: {}", e))?,
        Some(other) => other.clone(),
    };

    Ok(Artifact {
        name,
        source_code,
        props,
    })
}
