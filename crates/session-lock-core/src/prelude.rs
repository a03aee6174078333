//! Convenience prelude for lock types.

pub use crate::error::{LockError, LockResult};
pub use crate::handle::LockHandle;
pub use crate::liveness::LivenessSignal;
pub use crate::locker::{Locker, LockerBuilder};
pub use crate::timeout::WaitTimeout;
pub use crate::traits::{ConnectionProvider, LockConnection};
