pub const DEFAULT_RESPONSES_ENDPOINT: &str = "https://api.openai.com/v1/responses";
pub const DEFAULT_COMPONENT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

pub fn default_model() -> String {
    "gpt-4o".to_string()
}

pub fn default_component_model() -> String {
    "anthropic/claude-sonnet-4".to_string()
}

pub fn default_component_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

pub fn default_stream_timeout() -> u64 {
    30
}

pub fn default_max_num_results() -> u32 {
    10
}

pub fn default_max_round_trips() -> u32 {
    2
}

pub fn default_max_images() -> usize {
    3
}

pub fn default_retry_attempts() -> u32 {
    2 // one retry
}

/// Message cap of the chat-platform transport.
pub const PLATFORM_MAX_CHARS: usize = 2000;

/// Output budget that keeps answers under `PLATFORM_MAX_CHARS` most of the time.
pub const PLATFORM_MAX_OUTPUT_TOKENS: u32 = 400;
