mod filesystem;
mod pool;
mod storage;

pub use filesystem::{FilesystemSessionStore, SESSION_EXPIRY_MINUTES};
pub use pool::{SessionHandle, SessionPool};
pub use storage::{MemorySessionStore, SessionStore};

use crate::config::PromptTemplate;
use crate::error::{ChatError, Result};
use crate::models::{Message, Session, Settings};
use uuid::Uuid;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a documentation assistant. Answer questions using the \
documentation search tool, cite the relevant pages, and say so when the documentation does not cover a question.";

/// Create a new session seeded from the prompt template, if there is one.
pub fn create_new_session(
    settings: Settings,
    prompt: Option<&PromptTemplate>,
    tools: Vec<String>,
) -> Session {
    let mut session = Session::new(Uuid::new_v4().to_string(), settings);

    match prompt {
        Some(prompt) => {
            for message in &prompt.template_messages {
                session.push(message.clone());
            }
        }
        None => session.push(Message::system(DEFAULT_SYSTEM_PROMPT)),
    }

    session.tools = tools;
    session
}

/// Which conversation a run should continue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionChoice<'a> {
    /// The most recent unexpired session, or a fresh one.
    #[default]
    Recent,
    Fresh,
    Resume(&'a str),
}

/// Load or create the session for `choice`. A model override applies to
/// resumed and fresh sessions alike.
pub fn open_session(
    store: &dyn SessionStore,
    choice: SessionChoice<'_>,
    model_override: Option<&str>,
    fresh: impl FnOnce() -> Session,
) -> Result<Session> {
    let mut session = match choice {
        SessionChoice::Resume(id) => store
            .get(id)?
            .ok_or_else(|| ChatError::Session(format!("No conversation with id '{}'", id)))?,
        SessionChoice::Fresh => fresh(),
        SessionChoice::Recent => store.find_recent().unwrap_or_else(fresh),
    };

    if let Some(model) = model_override {
        session.settings.model = model.to_string();
    }
    Ok(session)
}
