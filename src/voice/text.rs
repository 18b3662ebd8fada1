//! Text normalization shared by speech input and output

use regex::Regex;
use std::sync::LazyLock;

/// Markup symbols stripped before synthesis and after recognition
static SYMBOL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*#@!]").expect("valid regex"));

/// Runs of whitespace
static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip denylisted symbols and collapse whitespace
#[must_use]
pub fn normalize(text: &str) -> String {
    let stripped = SYMBOL_REGEX.replace_all(text, "");
    WHITESPACE_REGEX
        .replace_all(stripped.trim(), " ")
        .into_owned()
}

/// Short preview of text for log fields
#[must_use]
pub fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 50;
    let mut out: String = text.chars().take(MAX_CHARS).collect();
    if text.chars().count() > MAX_CHARS {
        out.push('…');
    }
    out
}
