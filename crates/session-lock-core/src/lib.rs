//! Core types for locks backed by session-scoped database advisory locks.
//!
//! A [`Locker`] acquires a named lock over a dedicated connection and
//! returns a [`LockHandle`]. The handle keeps that connection checked out,
//! watches it from a background task, and exposes a [`LivenessSignal`] that
//! flips once the lock is released or its session is found dead.
//!
//! Database drivers plug in through [`ConnectionProvider`] and
//! [`LockConnection`].

pub mod error;
pub mod handle;
pub mod liveness;
pub mod locker;
mod monitor;
pub mod prelude;
pub mod timeout;
pub mod traits;

pub use error::{BoxError, LockError, LockResult};
pub use handle::LockHandle;
pub use liveness::LivenessSignal;
pub use locker::{Locker, LockerBuilder, ProviderLockHandle, DEFAULT_MONITOR_INTERVAL};
pub use timeout::WaitTimeout;
pub use traits::{AcquireOutcome, ConnectionProvider, LockConnection};
