//! Parsing of rate-limit (429) error text.
//!
//! The only wire format this crate touches is the free-text error message the
//! service emits when it sheds load:
//!
//! ```text
//! <free text>: ActivityID=<uuid>, RetryAfterMs=<integer>, Additional
//! details='Response status code does not indicate success: TooManyRequests (429); ...'
//! ```
//!
//! Detection needs only the marker substring; extraction expects the second
//! comma-delimited field to be `RetryAfterMs=<integer>` with whitespace
//! trimmed from the key only.

use std::time::Duration;

use tracing::trace;

/// Substring identifying a rate-limited response in the error text.
pub(crate) const RATE_LIMIT_MARKER: &str = "TooManyRequests (429)";

/// Key carrying the server-suggested wait, in milliseconds.
const RETRY_AFTER_KEY: &str = "RetryAfterMs";

/// Outcome of scanning a rate-limited message for a server-suggested wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryAfterHint {
    /// The server supplied `RetryAfterMs=<n>`.
    Server(Duration),
    /// The `RetryAfterMs` key was present but its value did not parse as a
    /// non-negative integer.
    Malformed,
    /// No `RetryAfterMs` field in the expected position.
    Absent,
}

/// Scans an error message for the rate-limit marker and, if present, extracts
/// the server-suggested wait from the second comma-delimited field.
///
/// Returns `None` when the message is not a rate-limit error at all, which
/// the policy translates into "stop retrying" - never "retry immediately".
pub(crate) fn retry_after_hint(message: &str) -> Option<RetryAfterHint> {
    if !message.contains(RATE_LIMIT_MARKER) {
        return None;
    }

    let Some(field) = message.split(',').nth(1) else {
        return Some(RetryAfterHint::Absent);
    };

    let mut kv = field.splitn(2, '=');
    let key = kv.next().unwrap_or_default().trim();
    if key != RETRY_AFTER_KEY {
        return Some(RetryAfterHint::Absent);
    }

    // The value is not trimmed: the service emits `RetryAfterMs=304` with no
    // inner whitespace, and anything else is treated as malformed.
    match kv.next().unwrap_or_default().parse::<u64>() {
        Ok(ms) => Some(RetryAfterHint::Server(Duration::from_millis(ms))),
        Err(err) => {
            trace!(field, %err, "rate-limit hint value did not parse");
            Some(RetryAfterHint::Malformed)
        }
    }
}
