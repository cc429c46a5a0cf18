use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who executes a tool call: the provider (hosted retrieval) or us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallKind {
    Hosted,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallState {
    Requested,
    Executing,
    Completed,
    Failed,
}

/// Tool call as it appears on the wire in item-added / item-done events.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallDescriptor {
    pub item_id: String,
    /// Provider id used to answer a function call; hosted calls reuse the item id.
    pub call_id: String,
    pub name: String,
    pub kind: ToolCallKind,
    /// Opaque until the owning tool parses it. Hosted search carries `{"queries": [..]}`.
    pub arguments: Value,
    /// Provider-returned results, present on done events for hosted tools.
    pub results: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub item_id: String,
    pub call_id: String,
    pub name: String,
    pub kind: ToolCallKind,
    pub arguments: Value,
    pub results: Option<Value>,
    pub state: ToolCallState,
}

impl ToolCall {
    pub fn requested(descriptor: ToolCallDescriptor) -> Self {
        Self {
            item_id: descriptor.item_id,
            call_id: descriptor.call_id,
            name: descriptor.name,
            kind: descriptor.kind,
            arguments: descriptor.arguments,
            results: descriptor.results,
            state: ToolCallState::Requested,
        }
    }

    /// Search queries for hosted retrieval, the raw arguments otherwise.
    pub fn input_for_display(&self) -> Value {
        match self.kind {
            ToolCallKind::Hosted => self
                .arguments
                .get("queries")
                .cloned()
                .unwrap_or_else(|| self.arguments.clone()),
            ToolCallKind::Function => self.arguments.clone(),
        }
    }

    pub fn needs_dispatch(&self) -> bool {
        self.kind == ToolCallKind::Function && self.state == ToolCallState::Completed
    }
}

/// Renderable element produced as a side effect of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub source_code: String,
    #[serde(default)]
    pub props: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub output: String,
    pub artifact: Option<Artifact>,
}

/// Tool declarations sent with a model invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolDefinition {
    Function {
        name: String,
        description: String,
        parameters: Value,
    },
    FileSearch {
        vector_store_ids: Vec<String>,
        max_num_results: u32,
    },
}

impl ToolDefinition {
    pub fn name(&self) -> &str {
        match self {
            ToolDefinition::Function { name, .. } => name,
            ToolDefinition::FileSearch { .. } => FILE_SEARCH_TOOL,
        }
    }
}

pub const FILE_SEARCH_TOOL: &str = "file_search";
