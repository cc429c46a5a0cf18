use super::tool::ToolCallDescriptor;

/// Output item carried by item-added / item-done events.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    ToolCall(ToolCallDescriptor),
    Message { id: String },
    /// Item types the assembler does not track (reasoning, etc.).
    Other { id: String, kind: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    ItemAdded {
        item: OutputItem,
    },
    ItemDone {
        item: OutputItem,
    },
    ContentPartAdded {
        item_id: String,
        content_index: u32,
    },
    TextDelta {
        item_id: String,
        content_index: u32,
        delta: String,
    },
    TextDone {
        item_id: String,
        content_index: u32,
    },
}

/// Key of one in-flight content part. Items can have several parts, so the
/// item id alone is not unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartKey {
    pub item_id: String,
    pub content_index: u32,
}

impl PartKey {
    pub fn new(item_id: impl Into<String>, content_index: u32) -> Self {
        Self {
            item_id: item_id.into(),
            content_index,
        }
    }
}

impl std::fmt::Display for PartKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.item_id, self.content_index)
    }
}
