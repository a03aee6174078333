//! Error types for lock operations.

use thiserror::Error;

use crate::timeout::WaitTimeout;

/// Boxed error produced by a database backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during lock operations.
///
/// Losing a lock after it was acquired is not an error: it is reported only
/// through the handle's [`LivenessSignal`](crate::liveness::LivenessSignal).
#[derive(Error, Debug)]
pub enum LockError {
    /// The provider could not supply a connection.
    #[error("failed to get a db connection: {0}")]
    Connection(#[source] BoxError),

    /// The caller's cancellation fired while waiting for the database.
    #[error("lock operation was cancelled before the database responded")]
    Cancelled,

    /// The database reported an internal error while acquiring the lock
    /// (out of memory, killed thread, or an unsupported timeout value).
    #[error("database reported an internal error while acquiring the lock")]
    Internal,

    /// The database-side wait expired without acquiring the lock.
    #[error("lock acquisition timed out after {0}")]
    Timeout(WaitTimeout),

    /// The release query reported that this session did not hold the lock.
    #[error("lock {0:?} was not held by this session")]
    NotHeld(String),

    /// The locker was configured incorrectly.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Any other backend or driver failure.
    #[error("could not read database response: {0}")]
    Backend(#[source] BoxError),
}

impl LockError {
    /// Returns `true` for errors a caller may reasonably retry with a new
    /// attempt (timeouts and database internal errors).
    pub fn is_retryable(&self) -> bool {
        matches!(self, LockError::Timeout(_) | LockError::Internal)
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
