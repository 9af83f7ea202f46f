//! Response sanitizer.
//!
//! Cleans the model's final reply before it reaches the user:
//! 1. Drop lines where the model speaks as the user (`User:` / `Human:`)
//! 2. Strip leftover inline speaker markers
//! 3. Strip vendor markup blocks (`<xai:...>...</xai:...>`, `<grok:...>`)
//! 4. Collapse runs of blank lines, trim
//!
//! The passes repeat until the text stops changing, so sanitizing twice
//! gives the same result as sanitizing once. Every pass that changes the
//! text also shortens it, so the loop terminates.
//!
//! If nothing usable is left, a fallback message is substituted.

use regex::Regex;
use std::sync::LazyLock;

/// Longest slice of the user's message echoed in a fallback reply
pub const MAX_ECHO_CHARS: usize = 60;

/// Reply used when sanitizing leaves nothing and no items were shown
pub const GENERIC_FALLBACK: &str = "What would you like to order?";

/// A whole line written as the other speaker
static SPEAKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:user|human)\s*:").unwrap());

/// A speaker marker anywhere in a line
static SPEAKER_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:user|human)\s*:[ \t]*").unwrap());

/// Paired vendor tags with their contents
static VENDOR_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:xai|grok):[a-z0-9_-]+\b[^>]*>.*?</(?:xai|grok):[a-z0-9_-]+\s*>").unwrap()
});

/// Unpaired or self-closing vendor tags
static VENDOR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:xai|grok):[a-z0-9_-]+\b[^>]*>").unwrap());

/// Two or more consecutive blank lines
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// Turn context for building a fallback reply
#[derive(Debug, Clone, Default)]
pub struct Fallback<'a> {
    /// Names of the menu items surfaced this turn
    pub shown_items: Vec<&'a str>,
    pub last_user_message: Option<&'a str>,
}

/// Full sanitizer: clean the reply, or substitute a fallback.
pub fn sanitize(raw: &str, fallback: &Fallback<'_>) -> String {
    let cleaned = clean(raw);
    if cleaned.is_empty() || SPEAKER_LINE.is_match(&cleaned) {
        return fallback_message(fallback);
    }
    cleaned
}

/// The cleaning passes without the fallback step.
pub fn clean(raw: &str) -> String {
    let mut current = raw.replace("\r\n", "\n");
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(text: &str) -> String {
    let kept: Vec<&str> = text
        .split('\n')
        .filter(|line| !SPEAKER_LINE.is_match(line))
        .collect();
    let text = kept.join("\n");
    let text = SPEAKER_INLINE.replace_all(&text, "");
    let text = VENDOR_BLOCK.replace_all(&text, "");
    let text = VENDOR_TAG.replace_all(&text, "");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Templated reply naming the surfaced items, or the generic prompt.
pub fn fallback_message(fallback: &Fallback<'_>) -> String {
    if fallback.shown_items.is_empty() {
        return GENERIC_FALLBACK.to_string();
    }

    let items = fallback.shown_items.join(", ");
    match fallback.last_user_message.map(echo).filter(|s| !s.is_empty()) {
        Some(echoed) => format!(
            "Here's what I found for \"{}\": {}. Want me to add any of these?",
            echoed, items
        ),
        None => format!("Here are some options: {}. Want me to add any of these?", items),
    }
}

/// Single-line, marker-free, length-bounded copy of the user's message
fn echo(message: &str) -> String {
    let flattened = message.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = clean(&flattened).replace('"', "'");
    if cleaned.chars().count() <= MAX_ECHO_CHARS {
        return cleaned;
    }
    let cut: String = cleaned.chars().take(MAX_ECHO_CHARS).collect();
    format!("{}...", cut.trim_end())
}
