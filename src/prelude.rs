//! Convenient re-exports for common redial types.
pub use crate::{
    clock::{Clock, ManualClock, SystemClock},
    config::RetryConfig,
    error::RetryError,
    layer::{Attempt, RetryLayer, RetryService},
    policy::{LimitedDurationRetryPolicy, LimitedErrorCountRetryPolicy, RetryPolicy},
    retry_loop::{within_deadline, RetryLoop},
    status::{Classify, Code, Status},
};
