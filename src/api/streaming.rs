use crate::error::{ChatError, Result};
use crate::models::{OutputItem, StreamEvent, ToolCallDescriptor, ToolCallKind};
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use tokio::time::{timeout, Duration};

pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE parser. Bytes are buffered until a full line is
/// available so multi-byte characters split across chunks survive.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(frame) = self.process_line(line) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Flush whatever is left when the connection closes.
    pub fn finish(&mut self) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw).trim_end().to_string();
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        if let Some(frame) = self.take_frame() {
            frames.push(frame);
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.take_frame();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(pos) => (&line[..pos], line[pos + 1..].trim_start()),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" | "retry" => tracing::trace!(field, value, "sse field"),
            _ => tracing::trace!(field, "unknown sse field"),
        }
        None
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        Some(SseFrame {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// What a single frame means for the turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(StreamEvent),
    Completed,
    Ignored,
}

pub fn parse_frame(frame: &SseFrame) -> Result<Frame> {
    if frame.data == "[DONE]" {
        return Ok(Frame::Completed);
    }

    let value: Value = serde_json::from_str(&frame.data)?;
    let event_type = value
        .get("type")
        .and_then(|t| t.as_str())
        .or(frame.event.as_deref())
        .unwrap_or_default();

    let frame = match event_type {
        "response.output_item.added" => Frame::Event(StreamEvent::ItemAdded {
            item: parse_item(&value)?,
        }),
        "response.output_item.done" => Frame::Event(StreamEvent::ItemDone {
            item: parse_item(&value)?,
        }),
        "response.content_part.added" => Frame::Event(StreamEvent::ContentPartAdded {
            item_id: str_field(&value, "item_id")?,
            content_index: index_field(&value),
        }),
        "response.output_text.delta" => Frame::Event(StreamEvent::TextDelta {
            item_id: str_field(&value, "item_id")?,
            content_index: index_field(&value),
            delta: str_field(&value, "delta")?,
        }),
        "response.output_text.done" => Frame::Event(StreamEvent::TextDone {
            item_id: str_field(&value, "item_id")?,
            content_index: index_field(&value),
        }),
        "response.completed" => Frame::Completed,
        "error" => {
            return Err(ChatError::Api {
                status: 0,
                message: value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("stream error")
                    .to_string(),
            })
        }
        // Cut short by the output token budget or a content filter; what
        // was streamed so far is the answer.
        "response.incomplete" => {
            let reason = value
                .pointer("/response/incomplete_details/reason")
                .and_then(|r| r.as_str())
                .unwrap_or("unknown");
            tracing::warn!(reason, "response incomplete");
            Frame::Completed
        }
        "response.failed" => {
            let message = value
                .pointer("/response/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or(event_type)
                .to_string();
            return Err(ChatError::Api { status: 0, message });
        }
        other => {
            tracing::trace!(event = other, "ignored stream event");
            Frame::Ignored
        }
    };

    Ok(frame)
}

fn parse_item(value: &Value) -> Result<OutputItem> {
    let item = value
        .get("item")
        .ok_or_else(|| ChatError::Other("Stream event without item".to_string()))?;
    let id = str_field(item, "id")?;
    let kind = item
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or_default();

    let output = match kind {
        "message" => OutputItem::Message { id },
        "function_call" => {
            let raw = item
                .get("arguments")
                .and_then(|a| a.as_str())
                .unwrap_or_default();
            let arguments = if raw.is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
            };
            OutputItem::ToolCall(ToolCallDescriptor {
                call_id: item
                    .get("call_id")
                    .and_then(|c| c.as_str())
                    .unwrap_or(&id)
                    .to_string(),
                item_id: id,
                name: str_field(item, "name")?,
                kind: ToolCallKind::Function,
                arguments,
                results: None,
            })
        }
        hosted if hosted.ends_with("_call") => {
            let queries = item.get("queries").cloned().unwrap_or(Value::Null);
            let results = item.get("results").cloned().filter(|r| !r.is_null());
            OutputItem::ToolCall(ToolCallDescriptor {
                call_id: id.clone(),
                item_id: id,
                name: hosted.trim_end_matches("_call").to_string(),
                kind: ToolCallKind::Hosted,
                arguments: serde_json::json!({ "queries": queries }),
                results,
            })
        }
        other => OutputItem::Other {
            id,
            kind: other.to_string(),
        },
    };

    Ok(output)
}

fn str_field(value: &Value, field: &str) -> Result<String> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ChatError::Other(format!("Stream event missing '{}'", field)))
}

fn index_field(value: &Value) -> u32 {
    value
        .get("content_index")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32
}

struct DecodeState<S> {
    bytes: S,
    decoder: SseDecoder,
    queued: VecDeque<Result<StreamEvent>>,
    done: bool,
}

/// Decode a byte stream into stream events. A chunk that takes longer than
/// `chunk_timeout` ends the stream with `ChatError::Timeout`.
pub fn decode_stream<S, E>(bytes: S, chunk_timeout: Duration) -> EventStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + Unpin + 'static,
    E: Into<ChatError> + Send + 'static,
{
    let state = DecodeState {
        bytes,
        decoder: SseDecoder::new(),
        queued: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, move |mut st| async move {
        loop {
            if let Some(item) = st.queued.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }

            let frames = match timeout(chunk_timeout, st.bytes.next()).await {
                Ok(Some(Ok(chunk))) => st.decoder.push(&chunk),
                Ok(Some(Err(e))) => {
                    st.done = true;
                    st.queued.push_back(Err(e.into()));
                    continue;
                }
                Ok(None) => {
                    st.done = true;
                    st.decoder.finish()
                }
                Err(_) => {
                    st.done = true;
                    st.queued.push_back(Err(ChatError::Timeout));
                    continue;
                }
            };

            for frame in frames {
                match parse_frame(&frame) {
                    Ok(Frame::Event(event)) => st.queued.push_back(Ok(event)),
                    Ok(Frame::Ignored) => {}
                    Ok(Frame::Completed) => {
                        st.done = true;
                        break;
                    }
                    Err(e) => {
                        st.done = true;
                        st.queued.push_back(Err(e));
                        break;
                    }
                }
            }
        }
    })
    .boxed()
}

pub fn event_stream(response: reqwest::Response, timeout_secs: u64) -> EventStream {
    decode_stream(
        response.bytes_stream().boxed(),
        Duration::from_secs(timeout_secs),
    )
}
