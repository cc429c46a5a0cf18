//! Turns the provider's event stream into tool steps and finished messages.
//!
//! The assembler is synchronous: the turn controller pulls events off the
//! stream and feeds them in one at a time, forwarding whatever notification
//! comes back to the transport.

use crate::error::ChatError;
use crate::models::{OutputItem, PartKey, StreamEvent, ToolCall, ToolCallState};
use crate::transport::TurnEvent;
use serde_json::Value;
use std::collections::HashMap;

/// Events the assembler tolerated instead of failing on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    /// Text deltas with no open accumulator.
    pub dropped_deltas: usize,
    /// item-done for a tool call that was never added or is already closed.
    pub unmatched_done: usize,
    /// text-done for a part that is not open.
    pub unmatched_text_done: usize,
    /// item-added reusing an id that is already open.
    pub duplicate_added: usize,
}

impl AssemblyStats {
    pub fn is_clean(&self) -> bool {
        *self == AssemblyStats::default()
    }
}

#[derive(Debug, Default)]
pub struct Assembler {
    tool_calls: HashMap<String, ToolCall>,
    tool_order: Vec<String>,
    pending: HashMap<PartKey, String>,
    finalized: Vec<String>,
    stats: AssemblyStats,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Returns the notification it produces, if any.
    pub fn apply(&mut self, event: StreamEvent) -> Option<TurnEvent> {
        match event {
            StreamEvent::ItemAdded {
                item: OutputItem::ToolCall(descriptor),
            } => {
                if self.tool_calls.contains_key(&descriptor.item_id) {
                    self.stats.duplicate_added += 1;
                    tracing::warn!(item_id = %descriptor.item_id, "duplicate tool call item ignored");
                    return None;
                }
                let mut call = ToolCall::requested(descriptor);
                call.state = ToolCallState::Executing;
                let notification = TurnEvent::ToolStepOpened {
                    item_id: call.item_id.clone(),
                    name: call.name.clone(),
                };
                self.tool_order.push(call.item_id.clone());
                self.tool_calls.insert(call.item_id.clone(), call);
                Some(notification)
            }
            StreamEvent::ItemDone {
                item: OutputItem::ToolCall(descriptor),
            } => {
                let Some(call) = self
                    .tool_calls
                    .get_mut(&descriptor.item_id)
                    .filter(|c| c.state == ToolCallState::Executing)
                else {
                    self.stats.unmatched_done += 1;
                    tracing::warn!(item_id = %descriptor.item_id, "tool call done without open step");
                    return None;
                };
                // The done event carries the final arguments and any hosted results.
                call.arguments = descriptor.arguments;
                call.results = descriptor.results;
                if !descriptor.call_id.is_empty() {
                    call.call_id = descriptor.call_id;
                }
                call.state = ToolCallState::Completed;
                Some(TurnEvent::ToolStepClosed {
                    item_id: call.item_id.clone(),
                    name: call.name.clone(),
                    input: pretty(&call.input_for_display()),
                    output: pretty(call.results.as_ref().unwrap_or(&Value::Array(Vec::new()))),
                })
            }
            StreamEvent::ItemAdded { .. } | StreamEvent::ItemDone { .. } => None,
            StreamEvent::ContentPartAdded {
                item_id,
                content_index,
            } => {
                let key = PartKey::new(item_id, content_index);
                self.pending.insert(key.clone(), String::new());
                Some(TurnEvent::MessageOpened { key })
            }
            StreamEvent::TextDelta {
                item_id,
                content_index,
                delta,
            } => {
                let key = PartKey::new(item_id, content_index);
                match self.pending.get_mut(&key) {
                    Some(text) => {
                        text.push_str(&delta);
                        Some(TurnEvent::TokenAppended { key, delta })
                    }
                    None => {
                        self.stats.dropped_deltas += 1;
                        tracing::warn!(part = %key, "text delta without open part dropped");
                        None
                    }
                }
            }
            StreamEvent::TextDone {
                item_id,
                content_index,
            } => {
                let key = PartKey::new(item_id, content_index);
                match self.pending.remove(&key) {
                    Some(text) => {
                        self.finalized.push(text.clone());
                        Some(TurnEvent::MessageFinalized { key, text })
                    }
                    None => {
                        self.stats.unmatched_text_done += 1;
                        tracing::debug!(part = %key, "text done for a closed part");
                        None
                    }
                }
            }
        }
    }

    pub fn stats(&self) -> AssemblyStats {
        self.stats
    }

    pub fn open_tool_calls(&self) -> usize {
        self.tool_calls
            .values()
            .filter(|c| c.state == ToolCallState::Executing)
            .count()
    }

    pub fn open_parts(&self) -> usize {
        self.pending.len()
    }

    /// Close the stream and hand back what was assembled.
    pub fn finish(self) -> Assembly {
        let Assembler {
            mut tool_calls,
            tool_order,
            pending,
            finalized,
            stats,
        } = self;

        let mut completed = Vec::new();
        let mut open_tool_calls = Vec::new();
        for id in tool_order {
            if let Some(call) = tool_calls.remove(&id) {
                match call.state {
                    ToolCallState::Executing => open_tool_calls.push(call),
                    _ => completed.push(call),
                }
            }
        }

        let mut open_parts: Vec<PartKey> = pending.into_keys().collect();
        open_parts.sort();

        Assembly {
            texts: finalized,
            tool_calls: completed,
            open_tool_calls,
            open_parts,
            stats,
        }
    }
}

/// Result of draining one model stream.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// Finalized text messages, in completion order.
    pub texts: Vec<String>,
    /// Completed tool calls, in the order they were opened.
    pub tool_calls: Vec<ToolCall>,
    pub open_tool_calls: Vec<ToolCall>,
    pub open_parts: Vec<PartKey>,
    pub stats: AssemblyStats,
}

impl Assembly {
    pub fn text(&self) -> String {
        self.texts.join("\n\n")
    }

    pub fn has_text(&self) -> bool {
        self.texts.iter().any(|t| !t.is_empty())
    }

    /// Completed calls we have to execute ourselves.
    pub fn dispatchable(&self) -> Vec<&ToolCall> {
        self.tool_calls.iter().filter(|c| c.needs_dispatch()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.open_tool_calls.is_empty() && self.open_parts.is_empty()
    }

    /// The end-of-stream condition for anything still open.
    pub fn incomplete_error(&self) -> Option<ChatError> {
        if self.is_complete() {
            None
        } else {
            Some(ChatError::IncompleteTurn {
                open_tool_calls: self.open_tool_calls.len(),
                open_messages: self.open_parts.len(),
            })
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
