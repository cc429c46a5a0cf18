use super::registry::{ToolContext, ToolRegistry};
use crate::error::{ChatError, Result};
use crate::models::{Session, ToolCall, ToolDefinition, ToolResult, FILE_SEARCH_TOOL};
use serde_json::Value;

/// Hosted vector-store search declared alongside the function tools.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub vector_store_ids: Vec<String>,
    pub max_num_results: u32,
}

pub struct ToolDispatcher {
    registry: ToolRegistry,
    retrieval: Option<Retrieval>,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry, retrieval: Option<Retrieval>) -> Self {
        Self {
            registry,
            retrieval,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Every tool name this dispatcher can declare.
    pub fn available(&self) -> Vec<String> {
        let mut names = self.registry.names();
        if self.retrieval.is_some() {
            names.insert(0, FILE_SEARCH_TOOL.to_string());
        }
        names
    }

    /// Declarations for the tools bound to `session`, in binding order.
    pub fn definitions(&self, session: &Session) -> Vec<ToolDefinition> {
        session
            .tools
            .iter()
            .filter_map(|name| {
                if name == FILE_SEARCH_TOOL {
                    return self.retrieval.as_ref().map(|r| ToolDefinition::FileSearch {
                        vector_store_ids: r.vector_store_ids.clone(),
                        max_num_results: r.max_num_results,
                    });
                }
                let definition = self.registry.definition(name);
                if definition.is_none() {
                    tracing::warn!(tool = %name, "bound tool is not available");
                }
                definition
            })
            .collect()
    }

    /// Execute one completed tool call against the session's bound tools.
    pub async fn dispatch(&self, call: &ToolCall, session: &mut Session) -> Result<ToolResult> {
        let handler = self
            .registry
            .get(&call.name)
            .filter(|_| session.has_tool(&call.name))
            .ok_or_else(|| ChatError::UnsupportedTool {
                name: call.name.clone(),
            })?;

        let arguments = match &call.arguments {
            Value::String(raw) => {
                serde_json::from_str(raw).map_err(|e| ChatError::InvalidToolArguments {
                    name: call.name.clone(),
                    message: e.to_string(),
                })?
            }
            other => other.clone(),
        };

        self.registry
            .validate_arguments(&call.name, &arguments)
            .map_err(|message| ChatError::InvalidToolArguments {
                name: call.name.clone(),
                message,
            })?;

        tracing::info!(tool = %call.name, call_id = %call.call_id, "dispatching tool call");

        let mut ctx = ToolContext {
            last_artifact: &mut session.last_artifact,
        };
        let output = handler.call(&arguments, &mut ctx).await?;

        Ok(ToolResult {
            call_id: call.call_id.clone(),
            name: call.name.clone(),
            output: output.content,
            artifact: output.artifact,
        })
    }
}
