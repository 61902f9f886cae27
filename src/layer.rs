//! Tower-native retry layer.
//!
//! Wraps a service that performs a single RPC attempt. The inner service receives an
//! [`Attempt`], which carries the request together with the deadline computed by the policy, and
//! is expected to honor that deadline (typically by setting it on the outgoing call).

use crate::error::RetryError;
use crate::policy::RetryPolicy;
use crate::retry_loop::give_up;
use crate::status::Classify;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower_layer::Layer;
use tower_service::Service;

/// One attempt of a retried request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt<Req> {
    pub request: Req,
    /// Absolute deadline for this attempt.
    pub deadline: Instant,
    /// 1-based attempt number.
    pub number: usize,
}

/// Layer applying a prototype retry policy to every request.
#[derive(Debug, Clone)]
pub struct RetryLayer {
    prototype: Arc<dyn RetryPolicy>,
}

impl RetryLayer {
    pub fn new<P: RetryPolicy + 'static>(prototype: P) -> Self {
        Self { prototype: Arc::new(prototype) }
    }

    pub fn from_boxed(prototype: Box<dyn RetryPolicy>) -> Self {
        Self { prototype: Arc::from(prototype) }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService { inner, prototype: self.prototype.clone() }
    }
}

/// Retry service produced by [`RetryLayer`].
#[derive(Debug, Clone)]
pub struct RetryService<S> {
    inner: S,
    prototype: Arc<dyn RetryPolicy>,
}

impl<S> RetryService<S> {
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, Req> Service<Req> for RetryService<S>
where
    Req: Clone + Send + 'static,
    S: Service<Attempt<Req>> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Classify + std::fmt::Display + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = RetryError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RetryError::Inner)
    }

    fn call(&mut self, request: Req) -> Self::Future {
        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let mut policy = self.prototype.clone_box();
        Box::pin(async move {
            let mut number = 0usize;
            loop {
                if number > 0 {
                    futures::future::poll_fn(|cx| inner.poll_ready(cx))
                        .await
                        .map_err(RetryError::Inner)?;
                }
                number += 1;
                let deadline = policy.operation_deadline();
                let attempt = Attempt { request: request.clone(), deadline, number };
                let error = match inner.call(attempt).await {
                    Ok(response) => return Ok(response),
                    Err(e) => e,
                };
                if policy.on_failure(&error) {
                    tracing::debug!(
                        attempt = number,
                        error = %error,
                        "rpc attempt failed; retrying"
                    );
                    continue;
                }
                return Err(give_up(number, error));
            }
        })
    }
}
