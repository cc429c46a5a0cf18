pub mod highlight;
pub mod output;
mod terminal;

pub use highlight::CodeBuffer;
pub use output::{display_artifact, display_notice, display_starters};
pub use terminal::TerminalTransport;
