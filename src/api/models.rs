use crate::models::{ContentPart, Message, Role, Settings, ToolDefinition};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Body of a streaming Responses API request.
#[derive(Serialize)]
pub struct RequestBody {
    pub model: String,
    pub input: Vec<Value>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestBody {
    pub fn new(history: &[Message], settings: &Settings, tools: &[ToolDefinition]) -> Self {
        let include = if tools
            .iter()
            .any(|t| matches!(t, ToolDefinition::FileSearch { .. }))
        {
            vec!["file_search_call.results".to_string()]
        } else {
            Vec::new()
        };

        Self {
            model: settings.model.clone(),
            input: history.iter().flat_map(input_items).collect(),
            stream: true,
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
            tools: tools.iter().map(tool_json).collect(),
            include,
            extra: settings.extra.clone(),
        }
    }
}

/// A history message can expand into several input items: an assistant
/// message that requested tools becomes one `function_call` item per call.
pub fn input_items(message: &Message) -> Vec<Value> {
    match message.role {
        Role::Tool => message
            .content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolResult { call_id, output } => Some(json!({
                    "type": "function_call_output",
                    "call_id": call_id,
                    "output": output,
                })),
                _ => None,
            })
            .collect(),
        role => {
            let mut items = Vec::new();
            let text_type = if role == Role::Assistant {
                "output_text"
            } else {
                "input_text"
            };
            let content: Vec<Value> = message
                .content
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(json!({"type": text_type, "text": text})),
                    ContentPart::Image { url } => {
                        Some(json!({"type": "input_image", "image_url": url}))
                    }
                    _ => None,
                })
                .collect();
            if !content.is_empty() {
                items.push(json!({"role": role.as_str(), "content": content}));
            }
            for (call_id, name, arguments) in message.tool_calls() {
                items.push(json!({
                    "type": "function_call",
                    "call_id": call_id,
                    "name": name,
                    "arguments": arguments_string(arguments),
                }));
            }
            items
        }
    }
}

pub fn tool_json(tool: &ToolDefinition) -> Value {
    match tool {
        ToolDefinition::Function {
            name,
            description,
            parameters,
        } => json!({
            "type": "function",
            "name": name,
            "description": description,
            "parameters": parameters,
        }),
        ToolDefinition::FileSearch {
            vector_store_ids,
            max_num_results,
        } => json!({
            "type": "file_search",
            "vector_store_ids": vector_store_ids,
            "max_num_results": max_num_results,
        }),
    }
}

fn arguments_string(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

/// Body of a non-streaming chat completion with a JSON-schema response format.
#[derive(Serialize)]
pub struct StructuredRequestBody {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub response_format: Value,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: role.as_str().to_string(),
            content: content.into(),
        }
    }
}
