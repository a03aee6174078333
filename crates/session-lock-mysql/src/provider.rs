//! MySQL connection provider and locker builder.

use std::time::Duration;

use session_lock_core::error::{BoxError, LockError, LockResult};
use session_lock_core::handle::LockHandle;
use session_lock_core::locker::{Locker, DEFAULT_MONITOR_INTERVAL};
use session_lock_core::traits::ConnectionProvider;
use sqlx::MySqlPool;
use tracing::{debug, instrument};

use crate::connection::{MySqlSession, MySqlTarget};

/// Locker acquiring MySQL `GET_LOCK` locks.
pub type MySqlLocker = Locker<MySqlConnectionProvider>;

/// Handle to a held MySQL lock.
pub type MySqlLockHandle = LockHandle<MySqlSession>;

/// Hands out pooled MySQL connections as lock sessions.
#[derive(Clone, Debug)]
pub struct MySqlConnectionProvider {
    pool: MySqlPool,
    hash_long_names: bool,
}

impl MySqlConnectionProvider {
    /// Creates a provider over an existing pool. Keys are sent verbatim.
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            hash_long_names: false,
        }
    }

    /// Shortens keys over MySQL's 64-character limit instead of letting
    /// `GET_LOCK` reject them. See [`crate::name`].
    pub fn hash_long_names(mut self, enabled: bool) -> Self {
        self.hash_long_names = enabled;
        self
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

impl ConnectionProvider for MySqlConnectionProvider {
    type Connection = MySqlSession;

    fn backend(&self) -> &'static str {
        "mysql"
    }

    async fn connect(&self) -> Result<MySqlSession, BoxError> {
        let connection = self.pool.acquire().await?;
        Ok(MySqlSession::new(connection, self.hash_long_names))
    }
}

/// Builder for a [`MySqlLocker`].
pub struct MySqlLockerBuilder {
    target: Option<MySqlTarget>,
    monitor_interval: Duration,
    hash_long_names: bool,
}

impl MySqlLockerBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            target: None,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            hash_long_names: false,
        }
    }

    /// Sets the MySQL connection string.
    pub fn connection_string(mut self, conn_str: impl Into<String>) -> Self {
        self.target = Some(MySqlTarget::ConnectionString(conn_str.into()));
        self
    }

    /// Sets an existing connection pool.
    pub fn pool(mut self, pool: MySqlPool) -> Self {
        self.target = Some(MySqlTarget::Pool(pool));
        self
    }

    /// Sets how often each held lock pings its connection.
    ///
    /// Besides detecting lost sessions, the ping keeps the connection from
    /// being closed by the server's `wait_timeout`, so keep this well below
    /// that setting.
    pub fn monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// See [`MySqlConnectionProvider::hash_long_names`].
    pub fn hash_long_names(mut self, enabled: bool) -> Self {
        self.hash_long_names = enabled;
        self
    }

    /// Builds the locker, opening the pool if a connection string was given.
    #[instrument(skip(self), fields(backend = "mysql", target = ?self.target))]
    pub async fn build(self) -> LockResult<MySqlLocker> {
        let target = self
            .target
            .ok_or_else(|| LockError::InvalidConfig("connection not specified".to_string()))?;

        let pool = target
            .get_pool()
            .await
            .map_err(|e| LockError::Connection(Box::new(e)))?;
        debug!("mysql pool ready");

        let provider = MySqlConnectionProvider::new(pool).hash_long_names(self.hash_long_names);
        Locker::builder(provider)
            .monitor_interval(self.monitor_interval)
            .build()
    }
}

impl Default for MySqlLockerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns a new builder for a [`MySqlLocker`].
pub fn builder() -> MySqlLockerBuilder {
    MySqlLockerBuilder::new()
}

/// Creates a locker for the given connection string with default settings.
pub async fn connect(connection_string: impl Into<String>) -> LockResult<MySqlLocker> {
    builder().connection_string(connection_string).build().await
}
