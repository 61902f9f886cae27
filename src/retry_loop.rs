//! Retry loop driving a [`RetryPolicy`] through one logical operation.
//!
//! Semantics:
//! - Every call to `execute` clones the prototype, so operations never share counters or
//!   deadlines.
//! - The operation receives the absolute deadline for its attempt; enforcing it is up to the
//!   transport (or [`within_deadline`]).
//! - After a failure the policy decides. On `false` the loop returns the last error, as
//!   [`RetryError::Permanent`] if it was classified permanent and [`RetryError::Exhausted`]
//!   otherwise.
//! - The loop never sleeps between attempts. Backoff belongs in the operation or a wrapping
//!   layer.
//!
//! Example
//! ```rust
//! use redial::{Code, LimitedErrorCountRetryPolicy, RetryLoop, Status};
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let retry = RetryLoop::new(LimitedErrorCountRetryPolicy::new(3, Duration::from_millis(500)));
//! let mut calls = 0;
//! let result = retry
//!     .execute(|_deadline| {
//!         calls += 1;
//!         let attempt = calls;
//!         async move {
//!             if attempt < 3 {
//!                 Err(Status::new(Code::Unavailable, "warming up"))
//!             } else {
//!                 Ok("ready")
//!             }
//!         }
//!     })
//!     .await;
//! assert_eq!(result.unwrap(), "ready");
//! # });
//! ```

use crate::error::RetryError;
use crate::policy::RetryPolicy;
use crate::status::Classify;
use std::future::Future;
use std::time::Instant;

/// Runs operations under fresh copies of a prototype retry policy.
#[derive(Debug, Clone)]
pub struct RetryLoop {
    prototype: Box<dyn RetryPolicy>,
}

impl RetryLoop {
    pub fn new<P: RetryPolicy + 'static>(prototype: P) -> Self {
        Self { prototype: Box::new(prototype) }
    }

    pub fn from_boxed(prototype: Box<dyn RetryPolicy>) -> Self {
        Self { prototype }
    }

    /// The prototype every operation is cloned from.
    pub fn prototype(&self) -> &dyn RetryPolicy {
        self.prototype.as_ref()
    }

    /// Run `operation` until it succeeds or the policy stops it.
    ///
    /// `operation` is called with the deadline of each attempt.
    pub async fn execute<T, E, Fut, Op>(&self, mut operation: Op) -> Result<T, RetryError<E>>
    where
        E: Classify + std::fmt::Display,
        Fut: Future<Output = Result<T, E>>,
        Op: FnMut(Instant) -> Fut,
    {
        let mut policy = self.prototype.clone_box();
        let mut attempts = 0usize;
        loop {
            let deadline = policy.operation_deadline();
            attempts += 1;
            let error = match operation(deadline).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if policy.on_failure(&error) {
                tracing::debug!(attempt = attempts, error = %error, "rpc attempt failed; retrying");
                continue;
            }
            return Err(give_up(attempts, error));
        }
    }
}

/// Build the terminal error once the policy has said no, logging why.
pub(crate) fn give_up<E>(attempts: usize, error: E) -> RetryError<E>
where
    E: Classify + std::fmt::Display,
{
    if error.is_permanent_failure() {
        tracing::debug!(attempts, error = %error, "rpc failed permanently");
        RetryError::Permanent { attempts, error }
    } else {
        tracing::warn!(attempts, error = %error, "retry policy exhausted");
        RetryError::Exhausted { attempts, error }
    }
}

/// Await `future`, giving up at `deadline`. Returns `None` if the deadline passed first.
///
/// For transports that can't propagate a deadline themselves. Requires a tokio runtime with the
/// time driver enabled.
pub async fn within_deadline<F: Future>(deadline: Instant, future: F) -> Option<F::Output> {
    tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), future).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::policy::{LimitedDurationRetryPolicy, LimitedErrorCountRetryPolicy};
    use crate::status::{Code, Status};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn success_first_attempt() {
        let retry = RetryLoop::new(LimitedErrorCountRetryPolicy::new(3, Duration::from_millis(100)));
        let counter = Arc::new(AtomicUsize::new(0));

        let result = retry
            .execute(|_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Status>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "Should only execute once");
    }

    #[tokio::test]
    async fn success_after_transient_failures() {
        let retry = RetryLoop::new(LimitedErrorCountRetryPolicy::new(5, Duration::from_millis(100)));
        let counter = Arc::new(AtomicUsize::new(0));

        let result = retry
            .execute(|_| {
                let counter = counter.clone();
                async move {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(Status::new(Code::Unavailable, format!("attempt {}", attempt)))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3, "Should succeed on 3rd attempt");
    }

    #[tokio::test]
    async fn exhaustion_reports_attempts_and_last_error() {
        let retry = RetryLoop::new(LimitedErrorCountRetryPolicy::new(2, Duration::from_millis(100)));
        let counter = Arc::new(AtomicUsize::new(0));

        let result = retry
            .execute(|_| {
                let counter = counter.clone();
                async move {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Status::new(Code::Unavailable, format!("attempt {}", attempt)))
                }
            })
            .await;

        // Two retries on top of the first attempt.
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            RetryError::Exhausted { attempts, error } => {
                assert_eq!(attempts, 3);
                assert_eq!(error.message(), "attempt 2");
            }
            e => panic!("Expected Exhausted, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn permanent_failure_short_circuits() {
        let retry = RetryLoop::new(LimitedErrorCountRetryPolicy::new(5, Duration::from_millis(100)));
        let counter = Arc::new(AtomicUsize::new(0));

        let result = retry
            .execute(|_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Status::new(Code::InvalidArgument, "bad"))
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1, "should not retry");
        let err = result.unwrap_err();
        assert!(err.is_permanent());
        assert_eq!(err.attempts(), 1);
    }

    #[tokio::test]
    async fn operation_receives_policy_deadlines() {
        let clock = ManualClock::new();
        let policy =
            LimitedDurationRetryPolicy::new(Duration::from_secs(1), Duration::from_millis(200))
                .with_clock(clock.clone());
        let retry = RetryLoop::new(policy);
        let mut seen = Vec::new();

        let result = retry
            .execute(|deadline| {
                seen.push(deadline - clock.origin());
                // Each attempt burns 450ms of simulated time.
                clock.advance(Duration::from_millis(450));
                async { Err::<(), _>(Status::new(Code::DeadlineExceeded, "slow")) }
            })
            .await;

        assert_eq!(
            seen,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(650),
                Duration::from_millis(1_000),
            ]
        );
        assert!(result.unwrap_err().is_exhausted());
    }

    #[tokio::test]
    async fn prototype_state_is_not_shared_between_operations() {
        let retry = RetryLoop::new(LimitedErrorCountRetryPolicy::new(1, Duration::from_millis(10)));
        for _ in 0..3 {
            let counter = Arc::new(AtomicUsize::new(0));
            let _ = retry
                .execute(|_| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(Status::new(Code::Aborted, "conflict"))
                    }
                })
                .await;
            assert_eq!(counter.load(Ordering::SeqCst), 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn within_deadline_times_out() {
        let deadline = Instant::now() + Duration::from_millis(50);
        let slow = within_deadline(deadline, tokio::time::sleep(Duration::from_secs(5))).await;
        assert!(slow.is_none());

        let deadline = Instant::now() + Duration::from_secs(5);
        let fast = within_deadline(deadline, async { 7 }).await;
        assert_eq!(fast, Some(7));
    }
}
