//! Retry loop around a flaky async call, each attempt bounded by the policy's deadline.
use redial::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Stand-in for a generated stub method: slow on the first call, unavailable on the second.
async fn get_book(call: usize) -> Result<String, Status> {
    match call {
        0 => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }
        1 => Err(Status::new(Code::Unavailable, "backend restarting")),
        _ => Ok("The Left Hand of Darkness".to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), RetryError<Status>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let retry = RetryLoop::new(LimitedDurationRetryPolicy::new(
        Duration::from_secs(3),
        Duration::from_millis(250),
    ));

    let calls = AtomicUsize::new(0);
    let book = retry
        .execute(|deadline| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                within_deadline(deadline, get_book(call))
                    .await
                    .unwrap_or_else(|| Err(Status::new(Code::DeadlineExceeded, "attempt timed out")))
            }
        })
        .await?;

    println!("{} (after {} attempts)", book, calls.load(Ordering::SeqCst));
    Ok(())
}
