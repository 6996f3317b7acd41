//! # cosmos-retry
//!
//! A retry-decision policy for Azure Cosmos DB's Cassandra API.
//!
//! ## Philosophy
//!
//! The policy is pure decision, the caller is pure action:
//! - **Decide**: [`RetryPolicy`] classifies a failed attempt into "retry now",
//!   "retry after a delay", or "give up" - no I/O, no sleeping, no scheduling.
//! - **Act**: the driver's request loop owns execution. It asks [`RetryPolicy::admit`]
//!   before each attempt and performs any wait a [`RetryDecision::RetryAfter`]
//!   verdict carries, using whatever timer primitive it already has.
//!
//! Because verdicts are plain data, waits stay cancellable and the policy can
//! be exercised entirely in tests.
//!
//! ## Quick Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use cosmos_retry::{RequestFailure, RetryDecision, RetryPolicy};
//!
//! // Up to 5 attempts; 429 backoffs default to 5000ms fixed / 1000ms growing.
//! let policy = RetryPolicy::new(5);
//!
//! // Ask before every attempt.
//! assert!(policy.admit(2));
//!
//! // Transient infrastructure failures retry immediately.
//! assert_eq!(
//!     policy.classify(&RequestFailure::ReadTimeout),
//!     RetryDecision::Retry,
//! );
//!
//! // Rate-limited responses carry a server-suggested wait.
//! let failure = RequestFailure::other(
//!     "Request rate is large: ActivityID=c268afb6, RetryAfterMs=42, \
//!      Additional details='Response status code does not indicate success: \
//!      TooManyRequests (429); ...'",
//! );
//! assert_eq!(
//!     policy.classify(&failure),
//!     RetryDecision::RetryAfter(Duration::from_millis(42)),
//! );
//!
//! // Everything else is surfaced to the caller.
//! let failure = RequestFailure::other("today is not your day!");
//! assert_eq!(policy.classify(&failure), RetryDecision::Rethrow);
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod policy;

mod rate_limit;

// Re-exports
pub use error::{RequestFailure, RetryDecision};
pub use policy::RetryPolicy;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{RequestFailure, RetryDecision};
    pub use crate::policy::RetryPolicy;
}
