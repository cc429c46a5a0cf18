//! Turn controller: runs one user turn from input to the sealed answer.

use crate::api::ModelInvocation;
use crate::assembler::{Assembler, Assembly, AssemblyStats};
use crate::error::{ChatError, Result};
use crate::models::{ContentPart, Message, Role, Session, ToolCall};
use crate::retry::RetryPolicy;
use crate::session::{SessionHandle, SessionStore};
use crate::tools::ToolDispatcher;
use crate::transport::{Transport, TurnEvent, LIMIT_REACHED_MESSAGE, RESPONSE_TOO_LONG_NOTICE};
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingModel,
    Streaming,
    ToolPending,
    Finalizing,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnLimits {
    /// Model re-entries allowed after tool calls within one user turn.
    pub max_round_trips: u32,
    /// User turns allowed per conversation.
    pub max_turns: Option<u32>,
    pub max_images: usize,
    pub turn_timeout: Option<Duration>,
    /// Applied to the primary model invocation.
    pub retry: RetryPolicy,
}

impl Default for TurnLimits {
    fn default() -> Self {
        Self {
            max_round_trips: 2,
            max_turns: None,
            max_images: 3,
            turn_timeout: None,
            retry: RetryPolicy::single_retry(),
        }
    }
}

/// What the user sent: text plus image URLs (`data:` URLs for attachments).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInput {
    pub text: String,
    pub images: Vec<String>,
}

impl UserInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReport {
    pub final_state: Option<TurnState>,
    /// Model invocations made, the first one included.
    pub invocations: u32,
    /// Re-entries into the model after tool results.
    pub round_trips: u32,
    pub tool_results: usize,
    pub failed_tools: usize,
    pub images_dropped: usize,
    /// Tool calls were left undispatched because the round-trip bound was hit.
    pub forced_finalize: bool,
    pub response_too_long: bool,
    pub text: String,
    pub stats: AssemblyStats,
}

pub struct Orchestrator {
    model: Arc<dyn ModelInvocation>,
    dispatcher: Arc<ToolDispatcher>,
    limits: TurnLimits,
    store: Option<Arc<dyn SessionStore>>,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ModelInvocation>,
        dispatcher: Arc<ToolDispatcher>,
        limits: TurnLimits,
    ) -> Self {
        Self {
            model,
            dispatcher,
            limits,
            store: None,
        }
    }

    /// Persist the session after every turn that touched it.
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn limits(&self) -> &TurnLimits {
        &self.limits
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Run a turn with the session locked for its whole duration, then
    /// persist it. A second turn on the same session waits here.
    pub async fn handle_turn(
        &self,
        handle: &SessionHandle,
        input: UserInput,
        transport: &mut dyn Transport,
    ) -> Result<TurnReport> {
        let mut session = handle.lock().await;
        let result = self.run_turn(&mut session, input, transport).await;

        let rejected = matches!(result, Err(ChatError::TurnLimitExceeded { .. }));
        if let (Some(store), false) = (&self.store, rejected) {
            if let Err(e) = store.put(&session) {
                tracing::error!(session = %session.session_id, error = %e, "failed to save session");
            }
        }

        result
    }

    #[tracing::instrument(skip_all, fields(session = %session.session_id, turn = session.counters.turns_used + 1))]
    pub async fn run_turn(
        &self,
        session: &mut Session,
        input: UserInput,
        transport: &mut dyn Transport,
    ) -> Result<TurnReport> {
        let mut report = TurnReport::default();
        // The turn timeout is checked at every suspension point so an expired
        // turn still leaves finalized text in history.
        let deadline = self.limits.turn_timeout.map(|limit| Instant::now() + limit);

        if let Some(limit) = self.limits.max_turns {
            if session.counters.turns_used >= limit {
                tracing::info!(limit, "turn rejected, conversation limit reached");
                transport
                    .emit(TurnEvent::Notice(LIMIT_REACHED_MESSAGE.to_string()))
                    .await?;
                return Err(ChatError::TurnLimitExceeded { limit });
            }
        }

        let mut images = input.images;
        if images.len() > self.limits.max_images {
            report.images_dropped = images.len() - self.limits.max_images;
            tracing::info!(dropped = report.images_dropped, "extra images dropped");
            images.truncate(self.limits.max_images);
        }
        session.push(Message::user_with_images(input.text, images));
        session.counters.turns_used += 1;

        loop {
            tracing::debug!(state = ?TurnState::AwaitingModel, round_trip = report.round_trips);
            report.invocations += 1;
            let assembly = match self.stream_once(session, transport, &mut report, deadline).await {
                Ok(assembly) => assembly,
                Err(e) => {
                    if matches!(e, ChatError::Timeout) {
                        tracing::error!(limit = ?self.limits.turn_timeout, "turn timed out");
                    }
                    let _ = transport.emit(TurnEvent::Error(e.to_string())).await;
                    return Err(e);
                }
            };

            let calls: Vec<&ToolCall> = assembly.dispatchable();
            if calls.is_empty() {
                return self.finalize(session, assembly, transport, report).await;
            }

            if report.round_trips >= self.limits.max_round_trips {
                tracing::warn!(
                    round_trips = report.round_trips,
                    pending = calls.len(),
                    "round-trip bound reached, finalizing without running tools"
                );
                report.forced_finalize = true;
                return self.finalize(session, assembly, transport, report).await;
            }

            tracing::debug!(state = ?TurnState::ToolPending, calls = calls.len());
            self.run_tools(session, &assembly, &calls, transport, &mut report, deadline)
                .await?;
            report.round_trips += 1;
        }
    }

    /// Invoke the model once and drain its stream through a fresh assembler.
    async fn stream_once(
        &self,
        session: &mut Session,
        transport: &mut dyn Transport,
        report: &mut TurnReport,
        deadline: Option<Instant>,
    ) -> Result<Assembly> {
        let tools = self.dispatcher.definitions(session);
        let history = &session.messages;
        let settings = &session.settings;
        let tools = &tools;
        let model = &self.model;

        let invocation = self
            .limits
            .retry
            .run("model", move |_| model.invoke(history, settings, tools));
        let mut stream = within(deadline, invocation)
            .await?
            .map_err(|exhausted| {
                tracing::error!(attempts = exhausted.attempts, error = %exhausted.error, "model invocation failed");
                exhausted.error
            })?;

        tracing::debug!(state = ?TurnState::Streaming);
        let mut assembler = Assembler::new();
        let mut stream_error = None;
        loop {
            let event = match within(deadline, stream.next()).await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("turn deadline passed while streaming");
                    stream_error = Some(e);
                    break;
                }
            };
            match event {
                Ok(event) => {
                    if let Some(notification) = assembler.apply(event) {
                        transport.emit(notification).await?;
                    }
                }
                Err(e) => {
                    stream_error = Some(e);
                    break;
                }
            }
        }

        let assembly = assembler.finish();
        report.stats = merge_stats(report.stats, assembly.stats);
        if !assembly.stats.is_clean() {
            tracing::warn!(stats = ?assembly.stats, "stream had tolerated protocol violations");
        }

        if stream_error.is_some() || !assembly.is_complete() {
            // Abandon the turn: keep what was finalized, drop what was in flight.
            if assembly.has_text() {
                session.push(Message::assistant(assembly.text()));
            }
            if let Some(incomplete) = assembly.incomplete_error() {
                if let Some(e) = &stream_error {
                    tracing::warn!(error = %e, "stream failed mid-turn");
                }
                tracing::warn!(
                    open_tool_calls = assembly.open_tool_calls.len(),
                    open_parts = assembly.open_parts.len(),
                    "turn ended incomplete"
                );
                return Err(incomplete);
            }
            if let Some(e) = stream_error {
                return Err(e);
            }
        }

        Ok(assembly)
    }

    async fn run_tools(
        &self,
        session: &mut Session,
        assembly: &Assembly,
        calls: &[&ToolCall],
        transport: &mut dyn Transport,
        report: &mut TurnReport,
        deadline: Option<Instant>,
    ) -> Result<()> {
        // The assistant's own turn: any text it finalized plus the calls it made.
        let mut content: Vec<ContentPart> = assembly
            .texts
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| ContentPart::Text { text: t.clone() })
            .collect();
        content.extend(calls.iter().map(|call| ContentPart::ToolCall {
            call_id: call.call_id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        }));
        session.push(Message {
            role: Role::Assistant,
            content,
            tool_call_id: None,
        });

        for (index, call) in calls.iter().enumerate() {
            let outcome = within(deadline, self.dispatcher.dispatch(call, session))
                .await
                .and_then(|result| result);
            match outcome {
                Ok(result) => {
                    if let Some(artifact) = result.artifact {
                        transport.emit(TurnEvent::ArtifactRendered(artifact)).await?;
                    }
                    session.push(Message::tool_result(result.call_id, result.output));
                    report.tool_results += 1;
                }
                Err(e) if e.is_contained_to_tool() => {
                    tracing::warn!(tool = %call.name, error = %e, "tool call failed");
                    report.failed_tools += 1;
                    transport.emit(TurnEvent::Error(e.to_string())).await?;
                    session.push(Message::tool_result(call.call_id.clone(), e.tool_output()));
                }
                Err(e) => {
                    tracing::error!(tool = %call.name, error = %e, "tool call aborted the turn");
                    report.failed_tools += calls.len() - index;
                    // Every call in history needs an answer or the next request is rejected.
                    for pending in &calls[index..] {
                        session.push(Message::tool_result(pending.call_id.clone(), e.tool_output()));
                    }
                    let _ = transport.emit(TurnEvent::Error(e.to_string())).await;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn finalize(
        &self,
        session: &mut Session,
        assembly: Assembly,
        transport: &mut dyn Transport,
        mut report: TurnReport,
    ) -> Result<TurnReport> {
        tracing::debug!(state = ?TurnState::Finalizing);
        let text = assembly.text();

        if assembly.has_text() {
            session.push(Message::assistant(text.clone()));
        } else {
            tracing::warn!("model finished without any text");
        }

        if let Some(limit) = transport.max_message_chars() {
            let length = text.chars().count();
            if length > limit {
                let err = ChatError::ResponseTooLong { length, limit };
                tracing::info!(error = %err, "answer exceeds transport limit");
                transport
                    .emit(TurnEvent::Notice(RESPONSE_TOO_LONG_NOTICE.to_string()))
                    .await?;
                report.response_too_long = true;
            }
        }

        report.text = text;
        report.final_state = Some(TurnState::Done);
        tracing::info!(
            invocations = report.invocations,
            round_trips = report.round_trips,
            tool_results = report.tool_results,
            "turn done"
        );
        Ok(report)
    }
}

/// Await `future`, giving up with `ChatError::Timeout` once `deadline` passes.
async fn within<F: Future>(deadline: Option<Instant>, future: F) -> Result<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future)
            .await
            .map_err(|_| ChatError::Timeout),
        None => Ok(future.await),
    }
}

fn merge_stats(a: AssemblyStats, b: AssemblyStats) -> AssemblyStats {
    AssemblyStats {
        dropped_deltas: a.dropped_deltas + b.dropped_deltas,
        unmatched_done: a.unmatched_done + b.unmatched_done,
        unmatched_text_done: a.unmatched_text_done + b.unmatched_text_done,
        duplicate_added: a.duplicate_added + b.duplicate_added,
    }
}
