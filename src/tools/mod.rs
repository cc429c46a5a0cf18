mod component;
mod dispatcher;
mod registry;

pub use component::{normalize_artifact, ComponentRequest, ComponentTool, COMPONENT_TOOL};
pub use dispatcher::{Retrieval, ToolDispatcher};
pub use registry::{ToolContext, ToolHandler, ToolOutput, ToolRegistry};
