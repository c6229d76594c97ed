//! Completion-signal extraction and matching.
//!
//! The agent signals completion by emitting the configured token inside a
//! `<promise>` tag pair, e.g. `<promise>DONE</promise>`. Tag matching is
//! case-insensitive and whitespace-tolerant; the token comparison itself is
//! case-sensitive after trimming.

use regex::Regex;
use tracing::debug;

/// Tag pattern: case-insensitive, dot matches newline, non-greedy capture.
const PROMISE_PATTERN: &str = r"(?is)<promise>(.*?)</promise>";

/// A successful completion match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionMatch {
    /// The trimmed inner text of the first promise tag, for logging.
    pub matched: String,
}

/// Scans `text` for a promise tag whose trimmed contents equal `token`.
///
/// Only the first tag in the text is considered. Returns `None` when no tag
/// is present or the captured text differs from the token (comparison is
/// case-sensitive after trimming surrounding whitespace).
///
/// # Example
///
/// ```
/// use wiggum::detect::detect_completion;
///
/// assert!(detect_completion("All done <promise>DONE</promise>", "DONE").is_some());
/// assert!(detect_completion("<promise> done </promise>", "DONE").is_none());
/// ```
#[must_use]
pub fn detect_completion(text: &str, token: &str) -> Option<CompletionMatch> {
    let Ok(re) = Regex::new(PROMISE_PATTERN) else {
        return None;
    };

    let captured = re.captures(text)?.get(1)?.as_str().trim().to_string();

    if captured == token {
        debug!(matched = %captured, "Completion promise matched");
        Some(CompletionMatch { matched: captured })
    } else {
        debug!(
            captured = %captured,
            expected = %token,
            "Promise tag found but token did not match"
        );
        None
    }
}
