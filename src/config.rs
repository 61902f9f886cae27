//! Declarative retry configuration.
//!
//! Clients are usually configured from a file or an options struct rather than code. A
//! [`RetryConfig`] describes which stopping criterion to use and with what limits, and builds the
//! prototype policy from that.
//!
//! With the `serde` feature enabled, configs use an internally tagged form with durations in
//! integer milliseconds:
//!
//! ```json
//! { "kind": "limited_duration", "max_duration_ms": 30000, "rpc_timeout_ms": 5000 }
//! ```

use crate::clock::Clock;
use crate::policy::{LimitedDurationRetryPolicy, LimitedErrorCountRetryPolicy, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Which retry policy to build, and its limits.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum RetryConfig {
    /// See [`LimitedErrorCountRetryPolicy`].
    LimitedErrorCount {
        max_failures: usize,
        #[cfg_attr(feature = "serde", serde(rename = "rpc_timeout_ms", with = "millis"))]
        rpc_timeout: Duration,
    },
    /// See [`LimitedDurationRetryPolicy`].
    LimitedDuration {
        #[cfg_attr(feature = "serde", serde(rename = "max_duration_ms", with = "millis"))]
        max_duration: Duration,
        #[cfg_attr(feature = "serde", serde(rename = "rpc_timeout_ms", with = "millis"))]
        rpc_timeout: Duration,
    },
}

impl RetryConfig {
    /// Build a prototype policy reading the system clock.
    pub fn build(&self) -> Box<dyn RetryPolicy> {
        match *self {
            RetryConfig::LimitedErrorCount { max_failures, rpc_timeout } => {
                Box::new(LimitedErrorCountRetryPolicy::new(max_failures, rpc_timeout))
            }
            RetryConfig::LimitedDuration { max_duration, rpc_timeout } => {
                Box::new(LimitedDurationRetryPolicy::new(max_duration, rpc_timeout))
            }
        }
    }

    /// Build a prototype policy reading `clock`.
    pub fn build_with_clock(&self, clock: Arc<dyn Clock>) -> Box<dyn RetryPolicy> {
        match *self {
            RetryConfig::LimitedErrorCount { max_failures, rpc_timeout } => Box::new(
                LimitedErrorCountRetryPolicy::new(max_failures, rpc_timeout).with_clock(clock),
            ),
            RetryConfig::LimitedDuration { max_duration, rpc_timeout } => Box::new(
                LimitedDurationRetryPolicy::new(max_duration, rpc_timeout).with_clock(clock),
            ),
        }
    }

    /// Per-attempt timeout, common to both policies.
    pub fn rpc_timeout(&self) -> Duration {
        match self {
            RetryConfig::LimitedErrorCount { rpc_timeout, .. }
            | RetryConfig::LimitedDuration { rpc_timeout, .. } => *rpc_timeout,
        }
    }
}

#[cfg(feature = "serde")]
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
