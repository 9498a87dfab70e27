//! Error type shared by the repository, aggregation and timer layers.

use thiserror::Error;

/// Boxed error from a storage backend.
pub type StorageSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the pomodoro core.
#[derive(Debug, Error)]
pub enum PomoError {
    /// The identifier is zero or negative and cannot address a record.
    #[error("invalid interval ID: {0}")]
    InvalidIdentifier(i64),

    /// No record exists for a well-formed identifier.
    #[error("interval not found: {0}")]
    NotFound(i64),

    /// The store holds no intervals at all.
    #[error("no intervals recorded")]
    NoRecords,

    /// Pause was requested while no interval is running.
    ///
    /// Callers treat this as a no-op.
    #[error("interval is not running")]
    NotRunning,

    /// Start was requested on an interval that already reached a terminal state.
    #[error("interval {0} already finished")]
    AlreadyFinished(i64),

    /// A persisted state code or category could not be decoded.
    #[error("invalid interval state: {0}")]
    InvalidState(String),

    /// Malformed duration or category input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend failed to read or write.
    #[error("storage failure: {0}")]
    Storage(#[source] StorageSource),
}

impl PomoError {
    /// Wraps a backend error as a storage failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }

    /// Whether the error is the recoverable "not running" condition of a pause request.
    pub const fn is_not_running(&self) -> bool {
        matches!(self, Self::NotRunning)
    }
}
