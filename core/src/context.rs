//! Request-scoped cancellation and deadlines.
//!
//! # Design
//! Every storage call runs inside `RequestContext::run`, which races the
//! storage future against the context's cancellation token and deadline.
//! Losing the race drops the storage future, which is how an in-flight query
//! gets abandoned. Nothing here retries.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::TodoError;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// A context cancelled together with `self`. It inherits the deadline,
    /// tightened to `timeout` when one is given.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match (self.deadline, timeout) {
            (Some(parent), Some(t)) => Some(parent.min(Instant::now() + t)),
            (None, Some(t)) => Some(Instant::now() + t),
            (parent, None) => parent,
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail fast if the request is already over.
    pub fn check(&self) -> Result<(), TodoError> {
        if self.token.is_cancelled() {
            return Err(TodoError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(TodoError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Await `fut` unless the context is cancelled or its deadline passes
    /// first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, TodoError>
    where
        F: Future<Output = Result<T, TodoError>>,
    {
        self.check()?;
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(TodoError::Cancelled),
            _ = expired => Err(TodoError::DeadlineExceeded),
            result = fut => result,
        }
    }
}
