#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # redial
//!
//! Retry policies for generated RPC client stubs.
//!
//! After every failed attempt a stub asks its policy two questions: *should I try again?* and
//! *how long may the next attempt run?* This crate defines that contract and ships two stopping
//! criteria for it.
//!
//! ## Features
//!
//! - **[`RetryPolicy`]** trait: `on_failure`, `operation_deadline`, fresh-state `clone_box`
//! - **Count-limited** ([`LimitedErrorCountRetryPolicy`]) and **duration-limited**
//!   ([`LimitedDurationRetryPolicy`]) policies
//! - **Injectable clocks** ([`SystemClock`], [`ManualClock`]) for deterministic tests
//! - **[`RetryLoop`]** and a tower **[`RetryLayer`]** driving a policy per operation
//! - **[`RetryConfig`]** for building prototype policies from configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use redial::{Code, LimitedDurationRetryPolicy, RetryError, RetryLoop, Status};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let retry = RetryLoop::new(LimitedDurationRetryPolicy::new(
//!         Duration::from_secs(10),
//!         Duration::from_secs(2),
//!     ));
//!
//!     let result: Result<(), RetryError<Status>> = retry
//!         .execute(|_deadline| async {
//!             // Issue the RPC here, bounded by `_deadline`.
//!             Err(Status::new(Code::InvalidArgument, "missing field"))
//!         })
//!         .await;
//!     assert!(result.unwrap_err().is_permanent());
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod layer;
pub mod policy;
pub mod prelude;
pub mod retry_loop;
pub mod status;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RetryConfig;
pub use error::RetryError;
pub use layer::{Attempt, RetryLayer, RetryService};
pub use policy::{
    LimitedDurationRetryPolicy, LimitedErrorCountRetryPolicy, RetryPolicy, MAX_POLICY_DURATION,
};
pub use retry_loop::{within_deadline, RetryLoop};
pub use status::{Classify, Code, Status};
