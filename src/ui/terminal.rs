use super::highlight::CodeBuffer;
use super::output::{display_artifact, display_notice, display_error, display_tool_step};
use crate::error::Result;
use crate::transport::{Transport, TurnEvent};
use async_trait::async_trait;
use colored::*;
use std::io::{self, Write};

/// Streams a turn to stdout as it happens.
pub struct TerminalTransport {
    code_buffer: CodeBuffer,
    max_chars: Option<usize>,
    /// Whether the current message has printed anything yet.
    streaming: bool,
}

impl TerminalTransport {
    pub fn new(max_chars: Option<usize>) -> Self {
        Self {
            code_buffer: CodeBuffer::new(),
            max_chars,
            streaming: false,
        }
    }

    fn end_message(&mut self) {
        let remaining = self.code_buffer.flush();
        if !remaining.is_empty() {
            print!("{}", remaining.trim_end());
        }
        if self.streaming {
            println!();
            self.streaming = false;
        }
    }
}

#[async_trait]
impl Transport for TerminalTransport {
    async fn emit(&mut self, event: TurnEvent) -> Result<()> {
        match event {
            TurnEvent::ToolStepOpened { name, .. } => {
                self.end_message();
                println!("{}", format!("Running {}...", name).dimmed());
            }
            TurnEvent::ToolStepClosed {
                name,
                input,
                output,
                ..
            } => display_tool_step(&name, &input, &output),
            TurnEvent::MessageOpened { .. } => {
                self.end_message();
            }
            TurnEvent::TokenAppended { delta, .. } => {
                let formatted = self.code_buffer.append(&delta);
                if !formatted.is_empty() {
                    print!("{}", formatted);
                    self.streaming = true;
                }
            }
            TurnEvent::MessageFinalized { .. } => {
                self.streaming = true;
                self.end_message();
            }
            TurnEvent::ArtifactRendered(artifact) => {
                self.end_message();
                display_artifact(&artifact);
            }
            TurnEvent::Notice(notice) => {
                self.end_message();
                display_notice(&notice);
            }
            TurnEvent::Error(error) => {
                self.end_message();
                display_error(&error);
            }
        }
        io::stdout().flush()?;
        Ok(())
    }

    fn max_message_chars(&self) -> Option<usize> {
        self.max_chars
    }
}
