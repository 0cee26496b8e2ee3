//! Evaluation context — cancellation and deadline for a single scaler call.
//!
//! The autoscaler hands an `EvalContext` to every blocking scaler operation.
//! Work wrapped in [`EvalContext::run`] stops as soon as the token is
//! cancelled or the deadline passes; the wrapped future is dropped, so
//! nothing stays blocked on a slow data source.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context-bound operation stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("cancelled")]
    Cancelled,
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    budget: Duration,
}

/// Cancellation token plus optional deadline, passed into every call.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    token: CancellationToken,
    deadline: Option<Deadline>,
}

impl EvalContext {
    /// A context that never times out and is cancelled only explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the context to a caller-owned cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Builder method: fail calls that run longer than `budget` from now.
    pub fn with_timeout(self, budget: Duration) -> Self {
        Self {
            deadline: Some(Deadline {
                at: Instant::now() + budget,
                budget,
            }),
            ..self
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first.
    ///
    /// Cancellation is checked before the future is polled, so an
    /// already-cancelled context never starts the work.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        let bounded = async {
            match self.deadline {
                Some(d) => tokio::time::timeout_at(d.at, fut)
                    .await
                    .map_err(|_| Interrupted::DeadlineExceeded(d.budget)),
                None => Ok(fut.await),
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Interrupted::Cancelled),
            res = bounded => res,
        }
    }
}
