//! MySQL backend for session locks.
//!
//! Uses MySQL's `GET_LOCK`, `RELEASE_LOCK` and `IS_USED_LOCK` functions.
//! Each held lock keeps one pooled connection checked out for its whole
//! life, because MySQL ties named locks to the session that took them.
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), session_lock_core::LockError> {
//! let locker = session_lock_mysql::connect("mysql://root@localhost:3306/").await?;
//! let handle = locker.obtain_timeout("nightly-report", 5).await?;
//! // ...
//! handle.release().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod name;
pub mod provider;

pub use connection::{MySqlSession, MySqlTarget};
pub use provider::{
    builder, connect, MySqlConnectionProvider, MySqlLockHandle, MySqlLocker, MySqlLockerBuilder,
};
