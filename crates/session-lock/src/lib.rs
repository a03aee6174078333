//! Mutual-exclusion locks backed by database session-scoped advisory locks.
//!
//! Independent processes coordinate on a string key, with the database as
//! the arbiter. A lock is owned by the database session that acquired it,
//! so each held lock keeps one dedicated connection checked out and a
//! background task pings it; if the session dies the database drops the
//! lock without telling anyone, and the handle's liveness signal is the
//! only way to find out.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use session_lock::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let locker = session_lock::mysql::builder()
//!         .connection_string("mysql://root@localhost:3306/")
//!         .monitor_interval(Duration::from_millis(500))
//!         .build()
//!         .await?;
//!
//!     // Wait up to 5 seconds on the server for the lock.
//!     let handle = locker.obtain_timeout("my-resource", 5).await?;
//!
//!     let liveness = handle.liveness();
//!     tokio::select! {
//!         _ = liveness.lost() => eprintln!("lock lost mid-work"),
//!         _ = tokio::time::sleep(Duration::from_secs(1)) => println!("work done"),
//!     }
//!
//!     handle.release().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports types from:
//! - `session-lock-core`: locker, handle, liveness signal, backend traits
//! - `session-lock-mysql`: MySQL `GET_LOCK` backend (also under [`mysql`])

// Re-export core types and traits
pub use session_lock_core::*;

// Re-export the MySQL backend
pub use session_lock_mysql as mysql;
pub use session_lock_mysql::{
    MySqlConnectionProvider, MySqlLockHandle, MySqlLocker, MySqlLockerBuilder, MySqlSession,
};
