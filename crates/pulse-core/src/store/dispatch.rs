use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::error::DomainError;

/// Outcome of starting an optimistic operation.
#[derive(Debug)]
pub enum Dispatch<T> {
    /// The change is applied locally and being persisted in the background.
    InFlight(InFlight<T>),
    /// A conflicting change is already pending; nothing changed.
    Ignored(T),
}

impl<T> Dispatch<T> {
    /// The value as it reads right now, before any settlement.
    pub fn current(&self) -> &T {
        match self {
            Dispatch::InFlight(flight) => &flight.optimistic,
            Dispatch::Ignored(value) => value,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Dispatch::Ignored(_))
    }

    /// Wait for the background write. An ignored dispatch resolves immediately.
    pub async fn settle(self) -> Result<T, DomainError> {
        match self {
            Dispatch::InFlight(flight) => flight.settlement.await,
            Dispatch::Ignored(value) => Ok(value),
        }
    }
}

/// An optimistic change whose persistence has not settled yet.
#[derive(Debug)]
pub struct InFlight<T> {
    pub optimistic: T,
    pub settlement: Settlement<T>,
}

/// Resolves once the gateway write is confirmed or rolled back.
///
/// Dropping it does not cancel the write.
#[derive(Debug)]
pub struct Settlement<T> {
    handle: JoinHandle<Result<T, DomainError>>,
}

impl<T> Settlement<T> {
    pub(crate) fn new(handle: JoinHandle<Result<T, DomainError>>) -> Self {
        Self { handle }
    }
}

impl<T> Future for Settlement<T> {
    type Output = Result<T, DomainError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => Poll::Ready(Err(DomainError::Internal(format!(
                "settlement task failed: {e}"
            )))),
            Poll::Pending => Poll::Pending,
        }
    }
}
