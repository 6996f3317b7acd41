//! Failure categories and retry verdicts.

use std::time::Duration;

/// A failed request attempt, as reported by the driver layer.
///
/// The three named variants are the transient infrastructure conditions the
/// policy always retries immediately. Everything else arrives as
/// [`RequestFailure::Other`] carrying the server's error text verbatim, which
/// is the only place rate-limit information lives on this wire.
///
/// # Examples
///
/// ```rust
/// use cosmos_retry::RequestFailure;
///
/// let failure = RequestFailure::other("today is not your day!");
/// assert_eq!(failure.to_string(), "today is not your day!");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    /// The coordinator did not receive enough read responses in time.
    ReadTimeout,
    /// Not enough replicas were alive to satisfy the request.
    Unavailable,
    /// The coordinator did not receive enough write acknowledgements in time.
    WriteTimeout,
    /// Any other failure, carrying the raw error message.
    Other(String),
}

impl RequestFailure {
    /// Build an [`RequestFailure::Other`] from any displayable error.
    pub fn other(err: impl std::fmt::Display) -> Self {
        Self::Other(err.to_string())
    }
}

impl std::fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadTimeout => write!(f, "read timed out"),
            Self::Unavailable => write!(f, "not enough replicas available"),
            Self::WriteTimeout => write!(f, "write timed out"),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RequestFailure {}

/// The policy's verdict on a failed attempt.
///
/// Verdicts are plain data; [`classify`](crate::RetryPolicy::classify) never
/// waits. A [`RetryDecision::RetryAfter`] verdict means the caller owes the
/// attached delay before re-issuing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop retrying and surface the error to the caller.
    Rethrow,
    /// Retry immediately, no backoff.
    Retry,
    /// Retry after waiting for the attached duration.
    RetryAfter(Duration),
}

impl RetryDecision {
    /// Returns true if the verdict allows another attempt.
    pub fn is_retry(&self) -> bool {
        !matches!(self, Self::Rethrow)
    }

    /// The wait the caller owes before retrying, if any.
    ///
    /// `None` for both [`RetryDecision::Rethrow`] and [`RetryDecision::Retry`];
    /// an immediate retry carries no delay at all, not a zero one.
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::RetryAfter(d) => Some(*d),
            Self::Rethrow | Self::Retry => None,
        }
    }
}
