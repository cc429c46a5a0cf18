use colored::*;
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};
use terminal_size::{terminal_size, Width};

const FENCE: &str = "```";
const MAX_RULE_WIDTH: usize = 80;

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAXES: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAXES.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme() -> &'static Theme {
    static THEME: OnceLock<Theme> = OnceLock::new();
    THEME.get_or_init(|| {
        let mut themes = ThemeSet::load_defaults().themes;
        themes
            .remove("Solarized (dark)")
            .or_else(|| themes.into_values().next())
            .unwrap_or_default()
    })
}

/// Width of the box rules, following the terminal up to a readable maximum.
pub fn rule_width() -> usize {
    terminal_size()
        .map(|(Width(w), _)| w as usize)
        .unwrap_or(MAX_RULE_WIDTH)
        .clamp(20, MAX_RULE_WIDTH)
}

pub fn open_rule(label: &str) -> String {
    let used = label.chars().count() + 4;
    format!(
        "{}[{}]{}\n",
        "┌─".dimmed(),
        label.cyan(),
        "─".repeat(rule_width().saturating_sub(used)).dimmed()
    )
}

pub fn close_rule() -> String {
    format!("{}{}\n", "└".dimmed(), "─".repeat(rule_width() - 1).dimmed())
}

pub fn highlight_code(code: &str, lang: Option<&str>) -> String {
    let syntaxes = syntax_set();
    let syntax = lang
        .and_then(|lang| {
            syntaxes
                .find_syntax_by_token(lang)
                .or_else(|| syntaxes.find_syntax_by_extension(lang))
        })
        .unwrap_or_else(|| syntaxes.find_syntax_plain_text());

    let mut highlighter = HighlightLines::new(syntax, theme());
    let mut output = String::new();
    for line in LinesWithEndings::from(code) {
        match highlighter.highlight_line(line, syntaxes) {
            Ok(ranges) => {
                let ranges: Vec<(Style, &str)> = ranges;
                output.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
            }
            Err(_) => output.push_str(line),
        }
    }
    // Reset colors so the highlighting does not bleed into following text.
    output.push_str("\x1b[0m");
    output
}

/// Render a complete block in one go.
pub fn boxed(label: &str, body: &str, lang: Option<&str>) -> String {
    let mut output = open_rule(label);
    let body = if body.ends_with('\n') {
        body.to_string()
    } else {
        format!("{}\n", body)
    };
    output.push_str(&highlight_code(&body, lang));
    output.push_str(&close_rule());
    output
}

/// Streaming markdown renderer: plain text passes through, fenced code
/// blocks are boxed and highlighted one complete line at a time.
#[derive(Default)]
pub struct CodeBuffer {
    buffer: String,
    in_code_block: bool,
    code_block_content: String,
    code_block_lang: Option<String>,
    displayed_lines: usize,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, content: &str) -> String {
        self.buffer.push_str(content);
        let mut output = String::new();

        while !self.buffer.is_empty() {
            if self.in_code_block {
                if !self.consume_code(&mut output) {
                    break;
                }
            } else if !self.consume_text(&mut output) {
                break;
            }
        }

        output
    }

    /// Returns false when more input is needed.
    fn consume_text(&mut self, output: &mut String) -> bool {
        let Some(start) = self.buffer.find(FENCE) else {
            // A trailing backtick may be the start of a fence.
            let keep = self.buffer.len() - self.buffer.trim_end_matches('`').len();
            let cut = self.buffer.len() - keep;
            output.push_str(&self.buffer[..cut]);
            self.buffer.drain(..cut);
            return false;
        };

        output.push_str(&self.buffer[..start]);
        let rest = &self.buffer[start + FENCE.len()..];
        let Some(newline) = rest.find('\n') else {
            // Language line incomplete, wait for more content
            self.buffer.drain(..start);
            return false;
        };

        let lang = rest[..newline].trim();
        self.code_block_lang = (!lang.is_empty()).then(|| lang.to_string());
        self.buffer = rest[newline + 1..].to_string();
        self.in_code_block = true;
        self.code_block_content.clear();
        self.displayed_lines = 0;
        output.push_str(&open_rule(self.code_block_lang.as_deref().unwrap_or("code")));
        true
    }

    fn consume_code(&mut self, output: &mut String) -> bool {
        match self.buffer.find(FENCE) {
            Some(end) => {
                self.code_block_content.push_str(&self.buffer[..end]);
                output.push_str(&self.pending_lines(true));
                output.push_str(&close_rule());

                self.buffer = self.buffer[end + FENCE.len()..].to_string();
                self.in_code_block = false;
                self.code_block_lang = None;
                true
            }
            None => {
                // Trailing backticks may be the start of the closing fence.
                let keep = self.buffer.len() - self.buffer.trim_end_matches('`').len();
                let cut = self.buffer.len() - keep;
                self.code_block_content.push_str(&self.buffer[..cut]);
                self.buffer.drain(..cut);
                output.push_str(&self.pending_lines(false));
                false
            }
        }
    }

    /// Highlight lines not shown yet. The last line is held back unless
    /// the block is complete, since it may still grow.
    fn pending_lines(&mut self, complete: bool) -> String {
        let lines: Vec<&str> = self.code_block_content.lines().collect();
        let upto = if complete || self.code_block_content.ends_with('\n') {
            lines.len()
        } else {
            lines.len().saturating_sub(1)
        };
        if upto <= self.displayed_lines {
            return String::new();
        }
        let fresh = lines[self.displayed_lines..upto].join("\n") + "\n";
        self.displayed_lines = upto;
        highlight_code(&fresh, self.code_block_lang.as_deref())
    }

    pub fn flush(&mut self) -> String {
        let mut output = String::new();

        if self.in_code_block {
            // Unterminated code block
            self.code_block_content.push_str(&self.buffer);
            output.push_str(&self.pending_lines(true));
            output.push_str(&close_rule());
        } else {
            output.push_str(&self.buffer);
        }

        *self = Self::default();
        output
    }
}
