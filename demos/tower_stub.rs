//! A tower-based client stub with its retry policy loaded from configuration.
use redial::prelude::*;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Service, ServiceBuilder, ServiceExt};

const CONFIG: &str = r#"{ "kind": "limited_error_count", "max_failures": 3, "rpc_timeout_ms": 200 }"#;

/// Fake channel that rejects the first two attempts of every request.
#[derive(Clone, Default)]
struct Channel {
    attempts: Arc<AtomicUsize>,
}

impl Service<Attempt<String>> for Channel {
    type Response = String;
    type Error = Status;
    type Future = Pin<Box<dyn Future<Output = Result<String, Status>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, attempt: Attempt<String>) -> Self::Future {
        let seen = self.attempts.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let budget = attempt.deadline.saturating_duration_since(std::time::Instant::now());
            tracing::info!(number = attempt.number, ?budget, "sending {}", attempt.request);
            if seen % 3 < 2 {
                Err(Status::new(Code::Unavailable, "connection reset"))
            } else {
                Ok(format!("{} ok", attempt.request))
            }
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config: RetryConfig = serde_json::from_str(CONFIG)?;
    let mut stub = ServiceBuilder::new()
        .layer(RetryLayer::from_boxed(config.build()))
        .service(Channel::default());

    for shelf in ["shelves/1", "shelves/2"] {
        let reply = ServiceExt::<String>::ready(&mut stub).await?.call(shelf.to_string()).await?;
        println!("{}", reply);
    }
    Ok(())
}
