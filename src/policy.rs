//! Retry policy configuration and the decision engine.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::error::{RequestFailure, RetryDecision};
use crate::rate_limit::{self, RetryAfterHint};

const DEFAULT_FIXED_BACKOFF_MS: u64 = 5_000;
const DEFAULT_GROWING_BACKOFF_MS: u64 = 1_000;

/// Upper bound (exclusive) of the random jitter added to growing backoff.
const GROWING_BACKOFF_JITTER_MS: u64 = 2_000;

/// A retry-decision policy for rate-limit-aware database clients.
///
/// One instance is built per client configuration and consulted by the
/// driver's request loop: [`admit`](Self::admit) before each attempt,
/// [`classify`](Self::classify) after each failure. The policy only decides;
/// it never sleeps or re-issues requests itself.
///
/// # Attempt budget
///
/// `max_attempts` of `-1` means unbounded retries. Any other value is a
/// numeric cap: an attempt is admitted while `attempts <= max_attempts`.
///
/// # Backoff
///
/// Rate-limited (429) failures are always retried, with the delay chosen in
/// order of preference:
/// 1. the server-suggested `RetryAfterMs` from the error text,
/// 2. the fixed backoff, when the attempt budget is bounded,
/// 3. the growing backoff times the last admitted attempt count, plus up to
///    2000ms of uniform jitter, when the budget is unbounded.
///
/// # Sharing
///
/// The last admitted attempt count is the one piece of mutable state. It is
/// stored atomically, so sharing one policy across threads is safe, but the
/// count is best-effort under concurrent use: requests interleaving their
/// `admit` calls overwrite each other, and a growing-backoff delay may then
/// be computed from another request's attempt count. Callers needing an
/// exact multiplier should give each in-flight request its own policy clone.
///
/// # Examples
///
/// ```rust
/// use cosmos_retry::{RequestFailure, RetryDecision, RetryPolicy};
///
/// let policy = RetryPolicy::new(5);
///
/// assert!(policy.admit(5));
/// assert!(!policy.admit(6));
///
/// assert_eq!(
///     policy.classify(&RequestFailure::Unavailable),
///     RetryDecision::Retry,
/// );
/// ```
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    max_attempts: i32,
    fixed_backoff: Duration,
    growing_backoff: Duration,
    #[cfg_attr(feature = "serde", serde(skip))]
    last_attempts: AtomicU32,
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget and default backoffs
    /// (5000ms fixed, 1000ms growing).
    ///
    /// `max_attempts` of `-1` means retry forever.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    ///
    /// use cosmos_retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3);
    /// assert_eq!(policy.max_attempts(), 3);
    /// assert_eq!(policy.fixed_backoff(), Duration::from_millis(5000));
    /// assert_eq!(policy.growing_backoff(), Duration::from_millis(1000));
    /// ```
    pub fn new(max_attempts: i32) -> Self {
        Self {
            max_attempts,
            fixed_backoff: Duration::from_millis(DEFAULT_FIXED_BACKOFF_MS),
            growing_backoff: Duration::from_millis(DEFAULT_GROWING_BACKOFF_MS),
            last_attempts: AtomicU32::new(0),
        }
    }

    /// Set the fixed backoff used when a bounded policy hits a rate limit
    /// with no server-suggested wait.
    pub fn with_fixed_backoff(mut self, d: Duration) -> Self {
        self.fixed_backoff = d;
        self
    }

    /// Set the growing-backoff base used when an unbounded policy hits a
    /// rate limit with no server-suggested wait.
    pub fn with_growing_backoff(mut self, d: Duration) -> Self {
        self.growing_backoff = d;
        self
    }

    /// Get the attempt budget (`-1` = unbounded).
    pub fn max_attempts(&self) -> i32 {
        self.max_attempts
    }

    /// Get the fixed backoff.
    pub fn fixed_backoff(&self) -> Duration {
        self.fixed_backoff
    }

    /// Get the growing-backoff base.
    pub fn growing_backoff(&self) -> Duration {
        self.growing_backoff
    }

    /// Get the most recently admitted attempt count.
    pub fn last_attempts(&self) -> u32 {
        self.last_attempts.load(Ordering::Relaxed)
    }

    /// Decide whether another attempt is permitted.
    ///
    /// `attempts` is the number of attempts already made for the current
    /// logical request, counted by the caller. The count is recorded for the
    /// growing-backoff formula as a side effect.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cosmos_retry::RetryPolicy;
    ///
    /// let bounded = RetryPolicy::new(2);
    /// assert!(bounded.admit(0));
    /// assert!(bounded.admit(2));
    /// assert!(!bounded.admit(3));
    ///
    /// let unbounded = RetryPolicy::new(-1);
    /// assert!(unbounded.admit(1_000_000));
    /// ```
    pub fn admit(&self, attempts: u32) -> bool {
        self.last_attempts.store(attempts, Ordering::Relaxed);
        self.max_attempts == -1 || i64::from(attempts) <= i64::from(self.max_attempts)
    }

    /// Classify a failed attempt into a [`RetryDecision`].
    ///
    /// Timeout and unavailable conditions retry immediately. Other failures
    /// retry only when their message carries the rate-limit marker, with the
    /// delay chosen as described on [`RetryPolicy`]; anything else is
    /// [`RetryDecision::Rethrow`].
    ///
    /// This call never waits and never fails: a rate-limit message whose
    /// `RetryAfterMs` value cannot be parsed degrades to a zero delay, as
    /// the wire contract requires, rather than surfacing a parse error.
    pub fn classify(&self, failure: &RequestFailure) -> RetryDecision {
        let decision = match failure {
            RequestFailure::ReadTimeout
            | RequestFailure::Unavailable
            | RequestFailure::WriteTimeout => RetryDecision::Retry,
            RequestFailure::Other(message) => match rate_limit::retry_after_hint(message) {
                None => RetryDecision::Rethrow,
                Some(RetryAfterHint::Server(delay)) => RetryDecision::RetryAfter(delay),
                Some(RetryAfterHint::Malformed) => RetryDecision::RetryAfter(Duration::ZERO),
                Some(RetryAfterHint::Absent) => RetryDecision::RetryAfter(self.fallback_backoff()),
            },
        };
        debug!(?decision, %failure, "classified failed attempt");
        decision
    }

    /// Backoff for a rate-limited failure with no server-suggested wait.
    fn fallback_backoff(&self) -> Duration {
        if self.max_attempts > -1 {
            return self.fixed_backoff;
        }
        let attempts = self.last_attempts.load(Ordering::Relaxed);
        let jitter = rand::rng().random_range(0..GROWING_BACKOFF_JITTER_MS);
        self.growing_backoff
            .saturating_mul(attempts)
            .saturating_add(Duration::from_millis(jitter))
    }
}

impl Clone for RetryPolicy {
    /// Cloning copies the configuration and the current attempt count; the
    /// clone's count evolves independently afterwards.
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            fixed_backoff: self.fixed_backoff,
            growing_backoff: self.growing_backoff,
            last_attempts: AtomicU32::new(self.last_attempts.load(Ordering::Relaxed)),
        }
    }
}

impl PartialEq for RetryPolicy {
    /// Equality compares configuration only, not the recorded attempt count.
    fn eq(&self, other: &Self) -> bool {
        self.max_attempts == other.max_attempts
            && self.fixed_backoff == other.fixed_backoff
            && self.growing_backoff == other.growing_backoff
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn test_bounded_admission() {
        let policy = RetryPolicy::new(5);

        assert!(policy.admit(0));
        assert!(policy.admit(5));
        assert!(!policy.admit(6));
    }

    #[test]
    fn test_unbounded_admission() {
        let policy = RetryPolicy::new(-1);

        assert!(policy.admit(0));
        assert!(policy.admit(u32::MAX));
    }

    #[test]
    fn test_zero_budget_admits_only_first_attempt() {
        let policy = RetryPolicy::new(0);

        assert!(policy.admit(0));
        assert!(!policy.admit(1));
    }

    #[test]
    fn test_negative_budget_other_than_minus_one_admits_nothing() {
        // Compared numerically, so every non-negative attempt count exceeds it.
        let policy = RetryPolicy::new(-5);

        assert!(!policy.admit(0));
        assert!(!policy.admit(1));
    }

    #[test]
    fn test_admit_records_attempt_count() {
        let policy = RetryPolicy::new(5);

        policy.admit(3);
        assert_eq!(policy.last_attempts(), 3);

        policy.admit(3);
        assert_eq!(policy.last_attempts(), 3);
    }

    #[test]
    fn test_transient_failures_retry_immediately() {
        for policy in [RetryPolicy::new(2), RetryPolicy::new(-1)] {
            assert_eq!(
                policy.classify(&RequestFailure::ReadTimeout),
                RetryDecision::Retry
            );
            assert_eq!(
                policy.classify(&RequestFailure::Unavailable),
                RetryDecision::Retry
            );
            assert_eq!(
                policy.classify(&RequestFailure::WriteTimeout),
                RetryDecision::Retry
            );
        }
    }

    #[test]
    fn test_non_rate_limited_failure_rethrows() {
        let policy = RetryPolicy::new(5);
        let failure = RequestFailure::other("error: today is not your day!");

        assert_eq!(policy.classify(&failure), RetryDecision::Rethrow);
    }

    #[test]
    fn test_server_hint_wins_over_configured_backoffs() {
        let policy = RetryPolicy::new(5)
            .with_fixed_backoff(Duration::from_millis(9_999))
            .with_growing_backoff(Duration::from_millis(9_999));
        let failure =
            RequestFailure::other("x: a=1, RetryAfterMs=42, TooManyRequests (429)");

        assert_eq!(
            policy.classify(&failure),
            RetryDecision::RetryAfter(Duration::from_millis(42))
        );
    }

    #[test]
    fn test_malformed_hint_degrades_to_zero_delay() {
        let policy = RetryPolicy::new(5);
        let failure =
            RequestFailure::other("x: a=1, RetryAfterMs=lots, TooManyRequests (429)");

        assert_eq!(
            policy.classify(&failure),
            RetryDecision::RetryAfter(Duration::ZERO)
        );
    }

    #[test]
    fn test_bounded_policy_falls_back_to_fixed_backoff() {
        let policy = RetryPolicy::new(5).with_fixed_backoff(Duration::from_millis(750));
        let failure = RequestFailure::other("x: a=1, b=2, TooManyRequests (429)");

        assert_eq!(
            policy.classify(&failure),
            RetryDecision::RetryAfter(Duration::from_millis(750))
        );
    }

    #[test]
    fn test_unbounded_policy_grows_with_attempts_and_jitter() {
        let policy = RetryPolicy::new(-1).with_growing_backoff(Duration::from_millis(1_000));
        policy.admit(2);
        let failure = RequestFailure::other("x: a=1, b=2, TooManyRequests (429)");

        let delay = policy
            .classify(&failure)
            .delay()
            .expect("rate-limited failure must carry a delay");
        assert!(delay >= Duration::from_millis(2_000), "got {:?}", delay);
        assert!(delay < Duration::from_millis(4_000), "got {:?}", delay);
    }

    #[test]
    fn test_unbounded_policy_with_no_admitted_attempts_is_jitter_only() {
        let policy = RetryPolicy::new(-1);
        let failure = RequestFailure::other("x: a=1, b=2, TooManyRequests (429)");

        let delay = policy
            .classify(&failure)
            .delay()
            .expect("rate-limited failure must carry a delay");
        assert!(delay < Duration::from_millis(2_000), "got {:?}", delay);
    }

    #[test]
    fn test_policy_is_clone() {
        let policy = RetryPolicy::new(3).with_fixed_backoff(Duration::from_millis(100));
        policy.admit(2);

        let cloned = policy.clone();
        assert_eq!(policy, cloned);
        assert_eq!(cloned.last_attempts(), 2);

        // Counts diverge after the clone.
        cloned.admit(7);
        assert_eq!(policy.last_attempts(), 2);
    }

    #[test]
    fn test_policy_is_debug() {
        let policy = RetryPolicy::new(3);
        let debug = format!("{:?}", policy);
        assert!(debug.contains("RetryPolicy"));
    }
}
