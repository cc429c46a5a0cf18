use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "docbot")]
#[command(about = "Ask the documentation assistant from the terminal", long_about = None)]
pub struct Args {
    #[arg(short = 'n', long = "new", help = "Start a new conversation")]
    pub new_conversation: bool,

    #[arg(long = "session", help = "Resume a specific conversation by id")]
    pub session_id: Option<String>,

    #[arg(long = "clear", help = "Clear all conversation history")]
    pub clear_history: bool,

    #[arg(
        short = 'i',
        long = "image",
        help = "Attach an image to the message (repeatable, first 3 are sent)"
    )]
    pub images: Vec<PathBuf>,

    #[arg(short = 'm', long = "model", help = "Model for the answer")]
    pub model: Option<String>,

    #[arg(
        long = "api-endpoint",
        help = "Custom Responses API base URL (e.g., http://localhost:8080/v1)"
    )]
    pub api_endpoint: Option<String>,

    #[arg(long = "prompt", help = "Prompt file with template messages, settings and tools")]
    pub prompt: Option<PathBuf>,

    #[arg(long = "max-turns", help = "Number of messages allowed per conversation")]
    pub max_turns: Option<u32>,

    #[arg(long = "max-chars", help = "Longest answer the output can display")]
    pub max_chars: Option<usize>,

    #[arg(
        long = "platform-cap",
        help = "Apply the chat platform limits (2000 characters, 400 output tokens)"
    )]
    pub platform_cap: bool,

    #[arg(long = "no-tools", help = "Disable all tools for this conversation")]
    pub no_tools: bool,

    #[arg(short = 'v', long = "verbose", help = "Log turn progress to stderr")]
    pub verbose: bool,

    #[arg(help = "Message to send; starts an interactive session when omitted")]
    pub command: Vec<String>,
}
