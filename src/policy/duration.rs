//! "Keep trying for this long."

use super::{deadline_after, normalize, RetryPolicy};
use crate::clock::{Clock, SystemClock};
use crate::status::Classify;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Retries transient failures until `max_duration` has passed since the policy was created.
///
/// The overall deadline is fixed when the policy (or a clone of it) is constructed, by reading
/// the clock once. Per-attempt deadlines never extend past it.
///
/// Cloning re-reads the clock: the copy gets a full `max_duration` window of its own.
#[derive(Debug)]
pub struct LimitedDurationRetryPolicy {
    clock: Arc<dyn Clock>,
    rpc_duration: Duration,
    max_duration: Duration,
    deadline: Instant,
}

impl LimitedDurationRetryPolicy {
    /// Both durations are kept at millisecond precision.
    pub fn new(max_duration: Duration, rpc_duration: Duration) -> Self {
        Self::from_parts(Arc::new(SystemClock), max_duration, rpc_duration)
    }

    /// Override the clock (useful for deterministic tests).
    ///
    /// The overall deadline is recomputed from the new clock.
    pub fn with_clock<C: Clock + 'static>(self, clock: C) -> Self {
        Self::from_parts(Arc::new(clock), self.max_duration, self.rpc_duration)
    }

    fn from_parts(clock: Arc<dyn Clock>, max_duration: Duration, rpc_duration: Duration) -> Self {
        let max_duration = normalize(max_duration);
        let deadline = deadline_after(clock.now(), max_duration);
        Self { clock, rpc_duration: normalize(rpc_duration), max_duration, deadline }
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    pub fn rpc_duration(&self) -> Duration {
        self.rpc_duration
    }

    /// The instant after which no further retries are allowed.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl Clone for LimitedDurationRetryPolicy {
    fn clone(&self) -> Self {
        Self::from_parts(self.clock.clone(), self.max_duration, self.rpc_duration)
    }
}

impl RetryPolicy for LimitedDurationRetryPolicy {
    fn clone_box(&self) -> Box<dyn RetryPolicy> {
        Box::new(self.clone())
    }

    fn on_failure(&mut self, status: &dyn Classify) -> bool {
        if status.is_permanent_failure() {
            tracing::trace!("permanent failure; not retrying");
            return false;
        }
        let now = self.clock.now();
        let retry = now < self.deadline;
        tracing::trace!(
            remaining_ms = self.deadline.saturating_duration_since(now).as_millis() as u64,
            retry,
            "transient failure"
        );
        retry
    }

    fn operation_deadline(&self) -> Instant {
        deadline_after(self.clock.now(), self.rpc_duration).min(self.deadline)
    }
}
