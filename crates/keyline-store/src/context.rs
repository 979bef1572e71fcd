//! Cancellation and deadline scope for store calls.
//!
//! A [`Context`] travels with every query operation. Store futures are raced
//! against its deadline and cancel signals by [`Context::run`]; the losing
//! store future is dropped, which aborts the in-flight call. keyline performs
//! no compensating rollback, so the store is left exactly as the backend
//! leaves an aborted request.

use std::future::{pending, Future};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{StoreError, StoreResult};

/// Execution scope for one or more store calls.
///
/// Cheap to clone. Narrowing (`with_timeout`, `with_cancel`) returns a new
/// context and never loosens the parent's constraints.
#[derive(Clone, Debug, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

/// Cancels every context derived from the [`Context::with_cancel`] call
/// that produced it. Dropping the handle does not cancel.
#[derive(Clone, Debug)]
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.cancel();
    }
}

impl Context {
    /// A context with no deadline that is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Bound the context by `timeout` from now (or the existing deadline,
    /// whichever is earlier).
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Derive a cancellable context. Cancelling the handle cancels the new
    /// context; cancelling any ancestor handle still applies too.
    pub fn with_cancel(mut self) -> (Self, CancelHandle) {
        let token = match &self.cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        self.cancel = Some(token.clone());
        (self, CancelHandle(token))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// The error a call under this context would fail with right now, if any.
    pub fn err(&self) -> Option<StoreError> {
        if self.is_cancelled() {
            return Some(StoreError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(StoreError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drive `fut` to completion unless the context expires or is cancelled
    /// first.
    pub async fn run<F, T>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            res = fut => res,
            _ = cancelled => Err(StoreError::Cancelled),
            _ = expired => Err(StoreError::DeadlineExceeded),
        }
    }
}
