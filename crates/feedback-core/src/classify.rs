//! Line classification and HTML highlighting for captured output
//!
//! Both functions are pure. [`highlight`] is not idempotent: it escapes HTML
//! before adding markup, so feeding its output back in double-escapes. Callers
//! highlight raw text exactly once.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::LogLevel;

static ERROR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:error|failed|exception)\b").expect("error pattern is valid")
});

static WARNING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:warning|warn)\b").expect("warning pattern is valid"));

// Check marks are not word characters, so they match anywhere in the line.
static SUCCESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:success|passed|completed)\b|[✓✔]").expect("success pattern is valid")
});

static INFO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:info|note)\b").expect("info pattern is valid"));

static PATH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/\\][\w/\\.-]+\.\w+").expect("path pattern is valid"));

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s]+").expect("url pattern is valid"));

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\b").expect("number pattern is valid"));

static TIMESTAMP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}:\d{2}:\d{2}").expect("timestamp pattern is valid"));

const ERROR_STYLE: &str = "color: #e74c3c; font-weight: bold;";
const WARNING_STYLE: &str = "color: #f39c12; font-weight: bold;";
const SUCCESS_STYLE: &str = "color: #2ecc71; font-weight: bold;";
const INFO_STYLE: &str = "color: #3498db;";
const PATH_STYLE: &str = "color: #1abc9c;";
const URL_STYLE: &str = "color: #3498db; text-decoration: underline;";
const NUMBER_STYLE: &str = "color: #9b59b6;";
const TIMESTAMP_STYLE: &str = "color: #95a5a6;";

/// Classify a raw output line
///
/// First match wins: Error > Warning > Success > Info > Other. Keywords are
/// matched case-insensitively on word boundaries.
pub fn classify(line: &str) -> LogLevel {
    if ERROR_PATTERN.is_match(line) {
        LogLevel::Error
    } else if WARNING_PATTERN.is_match(line) {
        LogLevel::Warning
    } else if SUCCESS_PATTERN.is_match(line) {
        LogLevel::Success
    } else if INFO_PATTERN.is_match(line) {
        LogLevel::Info
    } else {
        LogLevel::Other
    }
}

/// Render a raw line as HTML with inline colour spans
pub fn highlight(line: &str) -> String {
    highlight_as(line, classify(line))
}

/// Render a raw line whose level is already known
///
/// Classified lines are wrapped whole in their level colour. Unclassified
/// lines get individual spans for paths, URLs, integers and timestamps.
pub fn highlight_as(line: &str, level: LogLevel) -> String {
    let escaped = escape_html(line);

    let style = match level {
        LogLevel::Error => ERROR_STYLE,
        LogLevel::Warning => WARNING_STYLE,
        LogLevel::Success => SUCCESS_STYLE,
        LogLevel::Info => INFO_STYLE,
        LogLevel::Other => return highlight_tokens(&escaped),
    };

    span(style, &escaped)
}

/// Escape the characters that would otherwise be read as markup
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn span(style: &str, content: &str) -> String {
    format!(r#"<span style="{style}">{content}</span>"#)
}

#[derive(Debug, Clone, Copy)]
struct Token {
    start: usize,
    end: usize,
    style: &'static str,
}

impl Token {
    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// Colour paths, URLs, integers and timestamps without nesting spans.
///
/// Patterns claim text in a fixed order and the earliest claim wins: a later
/// match touching claimed text is dropped whole (the path inside a URL keeps
/// its colour, the integers of a timestamp keep theirs).
fn highlight_tokens(escaped: &str) -> String {
    let patterns: [(&Regex, &'static str); 4] = [
        (&*PATH_PATTERN, PATH_STYLE),
        (&*URL_PATTERN, URL_STYLE),
        (&*NUMBER_PATTERN, NUMBER_STYLE),
        (&*TIMESTAMP_PATTERN, TIMESTAMP_STYLE),
    ];

    let mut tokens: Vec<Token> = Vec::new();
    for (pattern, style) in patterns {
        for found in pattern.find_iter(escaped) {
            let (start, end) = (found.start(), found.end());
            if tokens.iter().any(|t| t.overlaps(start, end)) {
                continue;
            }
            tokens.push(Token { start, end, style });
        }
    }

    tokens.sort_by_key(|t| t.start);

    let mut out = String::with_capacity(escaped.len() + tokens.len() * 32);
    let mut cursor = 0;
    for token in &tokens {
        out.push_str(&escaped[cursor..token.start]);
        out.push_str(&span(token.style, &escaped[token.start..token.end]));
        cursor = token.end;
    }
    out.push_str(&escaped[cursor..]);
    out
}
