//! The retry policy contract.
//!
//! A generated RPC stub keeps one *prototype* policy per client. At the start of every logical
//! operation it asks the prototype for a fresh copy ([`RetryPolicy::clone_box`]) and drives that
//! copy through the attempts of the operation:
//!
//! - before an attempt, [`RetryPolicy::operation_deadline`] bounds how long the attempt may run;
//! - after a failed attempt, [`RetryPolicy::on_failure`] decides whether to try again.
//!
//! Semantics:
//! - A permanent failure always stops the loop, whatever budget remains.
//! - All state changes happen in `on_failure`; `operation_deadline` only reads.
//! - Clones share configuration and the clock, never counters or deadlines.
//!
//! Two stopping criteria ship with the crate: [`LimitedErrorCountRetryPolicy`] and
//! [`LimitedDurationRetryPolicy`]. The trait is open, so applications can add their own.
//!
//! ```
//! use redial::{Code, LimitedErrorCountRetryPolicy, RetryPolicy, Status};
//! use std::time::Duration;
//!
//! let prototype = LimitedErrorCountRetryPolicy::new(2, Duration::from_millis(100));
//! let mut policy = prototype.clone_box();
//! let unavailable = Status::new(Code::Unavailable, "try again");
//! assert!(policy.on_failure(&unavailable));
//! assert!(policy.on_failure(&unavailable));
//! assert!(!policy.on_failure(&unavailable));
//! ```

mod duration;
mod error_count;

pub use duration::LimitedDurationRetryPolicy;
pub use error_count::LimitedErrorCountRetryPolicy;

use crate::status::Classify;
use std::time::{Duration, Instant};

/// Upper bound for any configured duration (ten years); larger values are clamped so deadline
/// arithmetic on `Instant` stays in range.
pub const MAX_POLICY_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Decides whether a failed RPC attempt is retried and how long the next attempt may run.
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// A new policy with the same retry criteria and fresh state.
    fn clone_box(&self) -> Box<dyn RetryPolicy>;

    /// Record a failed attempt. Returns `true` if the operation should be retried.
    fn on_failure(&mut self, status: &dyn Classify) -> bool;

    /// The *deadline* for the next attempt, not its duration.
    ///
    /// This is unrelated to the overall deadline of [`LimitedDurationRetryPolicy`], after which
    /// retries are abandoned, although that policy caps the value returned here by it.
    fn operation_deadline(&self) -> Instant;
}

impl Clone for Box<dyn RetryPolicy> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl<P: RetryPolicy + ?Sized> RetryPolicy for Box<P> {
    fn clone_box(&self) -> Box<dyn RetryPolicy> {
        (**self).clone_box()
    }

    fn on_failure(&mut self, status: &dyn Classify) -> bool {
        (**self).on_failure(status)
    }

    fn operation_deadline(&self) -> Instant {
        (**self).operation_deadline()
    }
}

/// Drop sub-millisecond precision and clamp to [`MAX_POLICY_DURATION`].
pub(crate) fn normalize(duration: Duration) -> Duration {
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(millis).min(MAX_POLICY_DURATION)
}

/// `now + duration`, saturating at `now` only if the platform cannot represent the sum.
pub(crate) fn deadline_after(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration).unwrap_or(now)
}
