//! "Count errors and then stop."

use super::{deadline_after, normalize, RetryPolicy};
use crate::clock::{Clock, SystemClock};
use crate::status::Classify;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Retries up to `max_failures` transient failures, then gives up.
///
/// `max_failures` counts *retries*, not attempts: with `max_failures = 2` an operation may run
/// three times, and the third failure is the one that stops it.
///
/// There is no overall time budget; each attempt gets `rpc_duration` from the moment its deadline
/// is computed.
///
/// Cloning yields a policy with the same limits and a zeroed failure count.
#[derive(Debug)]
pub struct LimitedErrorCountRetryPolicy {
    clock: Arc<dyn Clock>,
    rpc_duration: Duration,
    failure_count: usize,
    max_failures: usize,
}

impl LimitedErrorCountRetryPolicy {
    /// `rpc_duration` is kept at millisecond precision.
    pub fn new(max_failures: usize, rpc_duration: Duration) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            rpc_duration: normalize(rpc_duration),
            failure_count: 0,
            max_failures,
        }
    }

    /// Override the clock (useful for deterministic tests).
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn max_failures(&self) -> usize {
        self.max_failures
    }

    pub fn rpc_duration(&self) -> Duration {
        self.rpc_duration
    }

    /// Transient failures recorded so far by this instance.
    pub fn failure_count(&self) -> usize {
        self.failure_count
    }
}

impl Clone for LimitedErrorCountRetryPolicy {
    fn clone(&self) -> Self {
        Self {
            clock: self.clock.clone(),
            rpc_duration: self.rpc_duration,
            failure_count: 0,
            max_failures: self.max_failures,
        }
    }
}

impl RetryPolicy for LimitedErrorCountRetryPolicy {
    fn clone_box(&self) -> Box<dyn RetryPolicy> {
        Box::new(self.clone())
    }

    fn on_failure(&mut self, status: &dyn Classify) -> bool {
        if status.is_permanent_failure() {
            tracing::trace!(failure_count = self.failure_count, "permanent failure; not retrying");
            return false;
        }
        let previous = self.failure_count;
        self.failure_count = self.failure_count.saturating_add(1);
        let retry = previous < self.max_failures;
        tracing::trace!(
            failure_count = self.failure_count,
            max_failures = self.max_failures,
            retry,
            "transient failure"
        );
        retry
    }

    fn operation_deadline(&self) -> Instant {
        deadline_after(self.clock.now(), self.rpc_duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::status::{Code, Status};

    fn transient() -> Status {
        Status::new(Code::Unavailable, "try again")
    }

    fn permanent() -> Status {
        Status::new(Code::InvalidArgument, "bad request")
    }

    #[test]
    fn two_failures_allowed_then_stop() {
        let mut policy = LimitedErrorCountRetryPolicy::new(2, Duration::from_millis(100));
        let decisions: Vec<bool> = (0..3).map(|_| policy.on_failure(&transient())).collect();
        assert_eq!(decisions, vec![true, true, false]);
    }

    #[test]
    fn max_failures_counts_retries_not_attempts() {
        // Exactly N retries are granted; the (N+1)-th failure ends the operation.
        for n in 0..6 {
            let mut policy = LimitedErrorCountRetryPolicy::new(n, Duration::from_millis(10));
            for i in 0..n {
                assert!(policy.on_failure(&transient()), "failure {} of {}", i + 1, n);
            }
            assert!(!policy.on_failure(&transient()), "failure {} of {}", n + 1, n);
        }
    }

    #[test]
    fn stays_exhausted() {
        let mut policy = LimitedErrorCountRetryPolicy::new(1, Duration::from_millis(10));
        assert!(policy.on_failure(&transient()));
        assert!(!policy.on_failure(&transient()));
        assert!(!policy.on_failure(&transient()));
    }

    #[test]
    fn permanent_failure_stops_with_budget_left() {
        let mut policy = LimitedErrorCountRetryPolicy::new(100, Duration::from_millis(10));
        assert!(!policy.on_failure(&permanent()));
        assert_eq!(policy.failure_count(), 0);
        assert!(policy.on_failure(&transient()));
    }

    #[test]
    fn deadline_tracks_clock_not_failures() {
        let clock = ManualClock::new();
        let mut policy =
            LimitedErrorCountRetryPolicy::new(3, Duration::from_millis(100)).with_clock(clock.clone());
        assert_eq!(policy.operation_deadline(), clock.now() + Duration::from_millis(100));

        policy.on_failure(&transient());
        policy.on_failure(&transient());
        clock.advance(Duration::from_secs(7));
        assert_eq!(policy.operation_deadline(), clock.now() + Duration::from_millis(100));

        // Exhaustion doesn't change the deadline either.
        policy.on_failure(&transient());
        policy.on_failure(&transient());
        assert_eq!(policy.operation_deadline(), clock.now() + Duration::from_millis(100));
    }

    #[test]
    fn deadline_is_side_effect_free() {
        let mut policy = LimitedErrorCountRetryPolicy::new(1, Duration::from_millis(5));
        for _ in 0..10 {
            policy.operation_deadline();
        }
        assert_eq!(policy.failure_count(), 0);
        assert!(policy.on_failure(&transient()));
    }

    #[test]
    fn clone_resets_failure_count() {
        let mut prototype = LimitedErrorCountRetryPolicy::new(2, Duration::from_millis(100));
        prototype.on_failure(&transient());
        prototype.on_failure(&transient());
        assert_eq!(prototype.failure_count(), 2);

        let mut fresh = prototype.clone();
        assert_eq!(fresh.failure_count(), 0);
        assert_eq!(fresh.max_failures(), 2);
        assert_eq!(fresh.rpc_duration(), Duration::from_millis(100));
        let decisions: Vec<bool> = (0..3).map(|_| fresh.on_failure(&transient())).collect();
        assert_eq!(decisions, vec![true, true, false]);
    }

    #[test]
    fn clone_box_is_independent_of_prototype() {
        let prototype = LimitedErrorCountRetryPolicy::new(1, Duration::from_millis(100));
        let mut a = prototype.clone_box();
        let mut b = prototype.clone_box();
        assert!(a.on_failure(&transient()));
        assert!(!a.on_failure(&transient()));
        assert!(b.on_failure(&transient()));
        assert_eq!(prototype.failure_count(), 0);
    }

    #[test]
    fn rpc_duration_truncated_to_millis() {
        let policy = LimitedErrorCountRetryPolicy::new(1, Duration::from_micros(2_500));
        assert_eq!(policy.rpc_duration(), Duration::from_millis(2));
    }
}
