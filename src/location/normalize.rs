//! Input normalizer: strips forwarding wrappers from pasted text.
//!
//! Handles the `gmaps tinyurl @` marker some forwarders prepend, the leading
//! `@` sigil used by share sheets, surrounding whitespace, and chat messages
//! that wrap a single link in prose. The result is not validated as a URL.

use regex::Regex;
use std::sync::LazyLock;

const FORWARD_MARKER: &str = "gmaps tinyurl @";

/// Sentence punctuation that ends up glued to a link quoted in prose.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '\'', '"'];

static EMBEDDED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid embedded url regex"));

/// Normalize pasted input. Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

// Every rewrite shortens the string, so the fixpoint loop terminates.
fn strip_once(s: &str) -> String {
    let trimmed = s.trim();

    if trimmed.contains(FORWARD_MARKER) {
        return trimmed.replace(FORWARD_MARKER, "");
    }
    if let Some(rest) = trimmed.strip_prefix('@') {
        return rest.to_string();
    }
    if trimmed.contains(char::is_whitespace) {
        let mut urls = EMBEDDED_URL.find_iter(trimmed);
        if let (Some(only), None) = (urls.next(), urls.next()) {
            return only.as_str().trim_end_matches(TRAILING_PUNCTUATION).to_string();
        }
    }
    trimmed.to_string()
}
