//! Scripted model doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use docbot::api::{decode_stream, EventStream, ModelInvocation, StructuredModel, StructuredRequest};
use docbot::error::{ChatError, Result};
use docbot::models::{
    Message, OutputItem, Settings, StreamEvent, ToolCallDescriptor, ToolCallKind, ToolDefinition,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Event builders
// ============================================================================

/// A complete assistant text message, streamed in a few deltas.
pub fn text_message(item_id: &str, text: &str) -> Vec<StreamEvent> {
    let mut events = vec![
        StreamEvent::ItemAdded {
            item: OutputItem::Message {
                id: item_id.to_string(),
            },
        },
        StreamEvent::ContentPartAdded {
            item_id: item_id.to_string(),
            content_index: 0,
        },
    ];
    let chars: Vec<char> = text.chars().collect();
    for chunk in chars.chunks(7) {
        events.push(StreamEvent::TextDelta {
            item_id: item_id.to_string(),
            content_index: 0,
            delta: chunk.iter().collect(),
        });
    }
    events.push(StreamEvent::TextDone {
        item_id: item_id.to_string(),
        content_index: 0,
    });
    events.push(StreamEvent::ItemDone {
        item: OutputItem::Message {
            id: item_id.to_string(),
        },
    });
    events
}

pub fn function_call(item_id: &str, call_id: &str, name: &str, arguments: Value) -> Vec<StreamEvent> {
    let descriptor = |arguments: Value| ToolCallDescriptor {
        item_id: item_id.to_string(),
        call_id: call_id.to_string(),
        name: name.to_string(),
        kind: ToolCallKind::Function,
        arguments,
        results: None,
    };
    vec![
        StreamEvent::ItemAdded {
            item: OutputItem::ToolCall(descriptor(json!({}))),
        },
        StreamEvent::ItemDone {
            item: OutputItem::ToolCall(descriptor(arguments)),
        },
    ]
}

pub fn file_search(item_id: &str, queries: Value, results: Value) -> Vec<StreamEvent> {
    let descriptor = |results: Option<Value>| ToolCallDescriptor {
        item_id: item_id.to_string(),
        call_id: item_id.to_string(),
        name: "file_search".to_string(),
        kind: ToolCallKind::Hosted,
        arguments: json!({ "queries": queries.clone() }),
        results,
    };
    vec![
        StreamEvent::ItemAdded {
            item: OutputItem::ToolCall(descriptor(None)),
        },
        StreamEvent::ItemDone {
            item: OutputItem::ToolCall(descriptor(Some(results.clone()))),
        },
    ]
}

// ============================================================================
// Primary model
// ============================================================================

pub enum Step {
    Events(Vec<StreamEvent>),
    /// Events followed by a mid-stream failure.
    Broken(Vec<StreamEvent>),
    /// The invocation itself fails with this HTTP status.
    Status(u16),
    /// Events, then the stream stays open without sending anything.
    Stall(Vec<StreamEvent>),
    /// A raw server-sent event body, decoded like a real response.
    Sse(String),
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub history: Vec<Message>,
    pub settings: Settings,
    pub tools: Vec<String>,
}

/// Model that replays queued steps, then `fallback` forever if set.
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    fallback: Option<Vec<StreamEvent>>,
    delay: Duration,
    pub invocations: Mutex<Vec<Invocation>>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: None,
            delay: Duration::ZERO,
            invocations: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn replies(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Step::Events(text_message(&format!("msg_{}", i), t)))
                .collect(),
        )
    }

    /// A model that answers every invocation with the same events.
    pub fn always(events: Vec<StreamEvent>) -> Self {
        let mut model = Self::new(Vec::new());
        model.fallback = Some(events);
        model
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn recorded(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelInvocation for ScriptedModel {
    async fn invoke(
        &self,
        history: &[Message],
        settings: &Settings,
        tools: &[ToolDefinition],
    ) -> Result<EventStream> {
        self.invocations.lock().unwrap().push(Invocation {
            history: history.to_vec(),
            settings: settings.clone(),
            tools: tools.iter().map(|t| t.name().to_string()).collect(),
        });

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let step = self.steps.lock().unwrap().pop_front();
        let step = match (step, &self.fallback) {
            (Some(step), _) => step,
            (None, Some(events)) => Step::Events(events.clone()),
            (None, None) => return Err(ChatError::Other("No scripted response queued".to_string())),
        };

        match step {
            Step::Events(events) => Ok(futures::stream::iter(events.into_iter().map(Ok)).boxed()),
            Step::Broken(events) => {
                let items: Vec<Result<StreamEvent>> = events
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(ChatError::Timeout)))
                    .collect();
                Ok(futures::stream::iter(items).boxed())
            }
            Step::Status(status) => Err(ChatError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            Step::Stall(events) => Ok(futures::stream::iter(events.into_iter().map(Ok))
                .chain(futures::stream::pending())
                .boxed()),
            Step::Sse(body) => {
                let chunks = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(body))]);
                Ok(decode_stream(chunks, Duration::from_secs(5)))
            }
        }
    }
}

// ============================================================================
// Structured model
// ============================================================================

pub enum Reply {
    Object(Value),
    /// Transport failure, e.g. a gateway timeout.
    Unavailable,
    /// Content that is not JSON.
    Garbage,
}

pub struct ScriptedStructured {
    replies: Mutex<VecDeque<Reply>>,
    pub requests: Mutex<Vec<StructuredRequest>>,
}

impl ScriptedStructured {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn recorded_requests(&self) -> Vec<StructuredRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredModel for ScriptedStructured {
    async fn complete(&self, request: &StructuredRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Object(value)) => Ok(value),
            Some(Reply::Unavailable) => Err(ChatError::Api {
                status: 503,
                message: "upstream unavailable".to_string(),
            }),
            Some(Reply::Garbage) => Err(serde_json::from_str::<Value>("{not json")
                .unwrap_err()
                .into()),
            None => Err(ChatError::Other("No scripted reply queued".to_string())),
        }
    }

    fn model_id(&self) -> &str {
        "scripted/component"
    }
}

/// Server-sent event frame in the Responses API layout.
pub fn sse(data: Value) -> String {
    format!(
        "event: {}\ndata: {}\n\n",
        data["type"].as_str().unwrap_or_default(),
        data
    )
}

pub fn linear_card() -> Value {
    json!({
        "name": "LinearIssueCard",
        "sourceCode": "export default function LinearIssueCard({ title }) {\n  return <div className=\"rounded border p-4\">{title}</div>;\n}",
        "props": "{\"title\": \"Fix login redirect\"}"
    })
}
