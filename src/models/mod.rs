mod event;
mod message;
mod session;
mod tool;

pub use event::{OutputItem, PartKey, StreamEvent};
pub use message::{ContentPart, Message, Role};
pub use session::{Counters, Session, Settings};
pub use tool::{
    Artifact, ToolCall, ToolCallDescriptor, ToolCallKind, ToolCallState, ToolDefinition,
    ToolResult, FILE_SEARCH_TOOL,
};
