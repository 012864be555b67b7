//! Plain-text sanitizing for admin-supplied list entries
//!
//! Entries end up inside match patterns, so anything that is not plain text
//! (markup, control characters, percent-encoded octets) is removed before an
//! entry is stored.

use once_cell::sync::Lazy;
use regex::Regex;

/// `<script>`/`<style>` blocks are dropped together with their bodies
static SCRIPT_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*?>.*?</(script|style)\s*>").unwrap()
});

/// A complete tag: `<` up to the next `>` with no `<` in between
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]*>").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n\t ]+").unwrap());

static PERCENT_OCTET: Lazy<Regex> = Lazy::new(|| Regex::new(r"%[a-fA-F0-9]{2}").unwrap());

/// Sanitize one line of admin input as plain text.
///
/// Stray `<` characters that do not open a tag are kept as `&lt;` so that
/// they cannot combine with later input into markup. The result is trimmed
/// and may be empty.
pub fn sanitize_text_field(input: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(input, "");
    let text = TAG.replace_all(&text, "");
    let text = text.replace('<', "&lt;");

    let text: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    let mut text = WHITESPACE_RUN.replace_all(&text, " ").trim().to_string();

    // Removing one octet can expose another ("%%4141" -> "%41")
    while PERCENT_OCTET.is_match(&text) {
        text = PERCENT_OCTET.replace_all(&text, "").to_string();
    }

    text.trim().to_string()
}

/// Strip markup from free text without touching anything else
pub fn strip_tags(input: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(input, "");
    TAG.replace_all(&text, "").to_string()
}
