//! Documentation assistant: streams answers from a hosted model, runs the
//! tools it asks for and keeps the conversation per session.

pub mod api;
pub mod assembler;
pub mod attachments;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod retry;
pub mod session;
pub mod tools;
pub mod transport;
pub mod ui;

pub use error::{ChatError, Result};
pub use orchestrator::{Orchestrator, TurnLimits, TurnReport, TurnState, UserInput};
pub use transport::{Transport, TurnEvent};
