//! Outbound side of a conversation: everything the user gets to see.

use crate::error::Result;
use crate::models::{Artifact, PartKey};
use async_trait::async_trait;

/// Fixed reply once a conversation has used all of its turns.
pub const LIMIT_REACHED_MESSAGE: &str =
    "Limit reached: this conversation has used all of its messages. Please start a new conversation.";

/// Fixed notice sent next to answers the transport cannot display in full.
pub const RESPONSE_TOO_LONG_NOTICE: &str =
    "The full answer is too long to display here. Please continue the conversation in the web app to read it.";

#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    ToolStepOpened {
        item_id: String,
        name: String,
    },
    ToolStepClosed {
        item_id: String,
        name: String,
        input: String,
        output: String,
    },
    MessageOpened {
        key: PartKey,
    },
    TokenAppended {
        key: PartKey,
        delta: String,
    },
    MessageFinalized {
        key: PartKey,
        text: String,
    },
    ArtifactRendered(Artifact),
    /// Fixed, user-visible assistant message that is not part of the model answer.
    Notice(String),
    Error(String),
}

#[async_trait]
pub trait Transport: Send {
    async fn emit(&mut self, event: TurnEvent) -> Result<()>;

    /// Longest assistant message the platform can display, if it has a limit.
    fn max_message_chars(&self) -> Option<usize> {
        None
    }
}

/// Transport that keeps every event. Used by tests and by callers that
/// render after the turn instead of while it streams.
#[derive(Debug, Default)]
pub struct CollectingTransport {
    pub events: Vec<TurnEvent>,
    pub max_chars: Option<usize>,
}

impl CollectingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_chars(max_chars: usize) -> Self {
        Self {
            events: Vec::new(),
            max_chars: Some(max_chars),
        }
    }

    pub fn notices(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TurnEvent::Notice(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn artifacts(&self) -> Vec<&Artifact> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TurnEvent::ArtifactRendered(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    pub fn finalized_texts(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TurnEvent::MessageFinalized { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for CollectingTransport {
    async fn emit(&mut self, event: TurnEvent) -> Result<()> {
        self.events.push(event);
        Ok(())
    }

    fn max_message_chars(&self) -> Option<usize> {
        self.max_chars
    }
}
