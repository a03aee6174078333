//! Backend traits: the only boundary between the locking logic and a
//! database driver.

use std::future::Future;

use crate::error::BoxError;
use crate::timeout::WaitTimeout;

// ============================================================================
// Acquire Outcome
// ============================================================================

/// Distinguished answers of a single acquire query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The calling session now owns the lock.
    Acquired,
    /// The database-side wait expired.
    TimedOut,
    /// The database reported its internal-error sentinel.
    InternalError,
}

// ============================================================================
// Lock Connection Trait
// ============================================================================

/// A single database session able to run the advisory-lock queries.
///
/// Named locks belong to the session that took them, so a connection that
/// acquired a lock must stay checked out until the lock is released.
/// Dropping a connection returns it to its pool; [`discard`](Self::discard)
/// closes it instead.
pub trait LockConnection: Send + 'static {
    /// Tries to take the named lock, waiting up to `timeout` on the server.
    fn acquire(
        &mut self,
        key: &str,
        timeout: WaitTimeout,
    ) -> impl Future<Output = Result<AcquireOutcome, BoxError>> + Send;

    /// Releases the named lock. Returns `false` when this session did not
    /// hold it.
    fn release(&mut self, key: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Returns whether any session currently holds the named lock.
    fn is_held(&mut self, key: &str) -> impl Future<Output = Result<bool, BoxError>> + Send;

    /// Cheap round trip proving the session is still usable.
    fn ping(&mut self) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Closes the connection instead of returning it to the pool. Used when
    /// its state is unknown, e.g. after an abandoned or failed query.
    fn discard(self);
}

// ============================================================================
// Connection Provider Trait
// ============================================================================

/// Source of exclusive connections, typically backed by a pool.
///
/// # Example
///
/// ```rust,ignore
/// let locker = Locker::new(MySqlConnectionProvider::new(pool));
/// let handle = locker.obtain("my-resource").await?;
/// ```
pub trait ConnectionProvider: Send + Sync + 'static {
    /// The connection type handed out by this provider.
    type Connection: LockConnection;

    /// Name used in tracing spans, e.g. `"mysql"`.
    fn backend(&self) -> &'static str {
        "unknown"
    }

    /// Checks out a connection for exclusive use.
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, BoxError>> + Send;
}
