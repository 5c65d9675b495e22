//! Error types for queue operations

use thiserror::Error;

/// Errors returned by push operations
///
/// Both variants hand the rejected item back so the caller can release or
/// retry it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError<T> {
    /// The queue was stopped; no further items are accepted
    #[error("queue is stopped")]
    Stopped(T),

    /// The timeout elapsed while the queue stayed full
    #[error("push timed out")]
    TimedOut(T),
}

impl<T> PushError<T> {
    /// Recovers the item that was not enqueued
    pub fn into_inner(self) -> T {
        match self {
            PushError::Stopped(item) | PushError::TimedOut(item) => item,
        }
    }
}

/// Errors returned by pop operations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PopError {
    /// The queue was stopped and fully drained
    #[error("queue is stopped and drained")]
    Stopped,

    /// The timeout elapsed while the queue stayed empty
    #[error("pop timed out")]
    TimedOut,
}
