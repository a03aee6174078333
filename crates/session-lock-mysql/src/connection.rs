//! MySQL sessions running the advisory-lock queries.

use std::borrow::Cow;
use std::fmt;

use session_lock_core::error::BoxError;
use session_lock_core::timeout::WaitTimeout;
use session_lock_core::traits::{AcquireOutcome, LockConnection};
use sqlx::pool::PoolConnection;
use sqlx::{Connection, MySql, MySqlPool};

use crate::name::encode_lock_name;

/// `GET_LOCK` returns NULL on internal errors; coalesced to this value.
const INTERNAL_ERROR_SENTINEL: i64 = 2;

/// Where the provider gets its pool from.
#[derive(Clone)]
pub enum MySqlTarget {
    /// Connect using a connection string.
    ConnectionString(String),
    /// Use an existing connection pool.
    Pool(MySqlPool),
}

impl MySqlTarget {
    /// Opens a pool for a connection string, or clones the given one.
    pub async fn get_pool(&self) -> Result<MySqlPool, sqlx::Error> {
        match self {
            MySqlTarget::ConnectionString(url) => MySqlPool::connect(url).await,
            MySqlTarget::Pool(pool) => Ok(pool.clone()),
        }
    }
}

impl fmt::Debug for MySqlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MySqlTarget::ConnectionString(_) => {
                write!(f, "MySqlTarget::ConnectionString([REDACTED])")
            }
            MySqlTarget::Pool(_) => write!(f, "MySqlTarget::Pool([POOL])"),
        }
    }
}

/// A pooled MySQL connection used as a lock session.
///
/// Named locks taken with `GET_LOCK` belong to this session and vanish when
/// it closes.
pub struct MySqlSession {
    connection: PoolConnection<MySql>,
    hash_long_names: bool,
}

impl MySqlSession {
    pub(crate) fn new(connection: PoolConnection<MySql>, hash_long_names: bool) -> Self {
        Self {
            connection,
            hash_long_names,
        }
    }

    fn lock_name<'a>(&self, key: &'a str) -> Cow<'a, str> {
        if self.hash_long_names {
            encode_lock_name(key)
        } else {
            Cow::Borrowed(key)
        }
    }
}

impl LockConnection for MySqlSession {
    async fn acquire(&mut self, key: &str, timeout: WaitTimeout) -> Result<AcquireOutcome, BoxError> {
        let name = self.lock_name(key);
        let code: i64 = sqlx::query_scalar("SELECT COALESCE(GET_LOCK(?, ?), 2)")
            .bind(name.as_ref())
            .bind(timeout.as_secs())
            .fetch_one(&mut *self.connection)
            .await?;
        decode_get_lock(code)
    }

    async fn release(&mut self, key: &str) -> Result<bool, BoxError> {
        let name = self.lock_name(key);
        // 1 released, 0 held by another session, NULL not held at all.
        let released: Option<i64> = sqlx::query_scalar("SELECT RELEASE_LOCK(?)")
            .bind(name.as_ref())
            .fetch_one(&mut *self.connection)
            .await?;
        Ok(released == Some(1))
    }

    async fn is_held(&mut self, key: &str) -> Result<bool, BoxError> {
        let name = self.lock_name(key);
        let held: i64 = sqlx::query_scalar("SELECT IS_USED_LOCK(?) IS NOT NULL")
            .bind(name.as_ref())
            .fetch_one(&mut *self.connection)
            .await?;
        Ok(held != 0)
    }

    async fn ping(&mut self) -> Result<(), BoxError> {
        self.connection.ping().await?;
        Ok(())
    }

    fn discard(mut self) {
        self.connection.close_on_drop();
    }
}

fn decode_get_lock(code: i64) -> Result<AcquireOutcome, BoxError> {
    match code {
        1 => Ok(AcquireOutcome::Acquired),
        0 => Ok(AcquireOutcome::TimedOut),
        INTERNAL_ERROR_SENTINEL => Ok(AcquireOutcome::InternalError),
        other => Err(format!("unexpected GET_LOCK result: {other}").into()),
    }
}
