//! Failure boundary around the MIME walker.

use tracing::warn;

use super::walker::extract_readable_text;

/// Characters of raw input kept when the walker gives up.
pub const FALLBACK_PREFIX_CHARS: usize = 1000;

/// Turn a raw message into readable text. Never fails.
///
/// Any walker error produces the first [`FALLBACK_PREFIX_CHARS`] characters
/// of the raw message instead, so downstream always has something to
/// summarize.
pub fn normalize(raw: &str) -> String {
    match extract_readable_text(raw) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "MIME parsing failed, using raw prefix");
            truncate_chars(raw, FALLBACK_PREFIX_CHARS).to_string()
        }
    }
}

/// Longest prefix of `text` with at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
