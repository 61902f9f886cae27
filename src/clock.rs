//! Clock abstractions used by retry policies to compute deadlines.
//!
//! Policies never read the system time directly; they ask a [`Clock`]. Production code uses
//! [`SystemClock`], tests inject a [`ManualClock`] and move time forward explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Clock abstraction so deadlines can be computed against simulated time in tests.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Clock backed by `Instant::now()`.
///
/// Notes: `Instant` resets when the process restarts, which is fine here because policies never
/// outlive the operation they guard.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Simulated clock that only moves when told to.
///
/// Clones share the same timeline, so a test can keep one handle and give another to a policy.
///
/// ```
/// use redial::clock::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_millis(250));
/// assert_eq!(clock.now() - start, Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Simulated clock whose time zero is the moment of construction.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Simulated clock whose time zero is `origin`.
    pub fn starting_at(origin: Instant) -> Self {
        Self { origin, elapsed_nanos: Arc::new(AtomicU64::new(0)) }
    }

    /// The instant this clock reports before any time has been advanced.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Simulated time elapsed since the origin.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }

    /// Move time forward by `by`. Saturates instead of wrapping.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self.elapsed_nanos.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
            Some(cur.saturating_add(by))
        });
    }

    /// Jump to an absolute offset from the origin. Time may move backwards.
    pub fn set_elapsed(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.store(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let elapsed = self.elapsed();
        self.origin.checked_add(elapsed).unwrap_or(self.origin)
    }
}
