//! Handle to a held lock.

use std::fmt;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::error::{LockError, LockResult};
use crate::liveness::{LivenessSignal, LivenessTrigger};
use crate::monitor::Monitor;
use crate::traits::LockConnection;

/// A held named lock bound to one dedicated connection.
///
/// Created only by a successful [`Locker`](crate::locker::Locker)
/// acquisition. While the handle exists a background monitor pings the
/// connection; if the session dies the database drops the lock silently and
/// the monitor cancels the [`LivenessSignal`].
///
/// Call [`release`](Self::release) to give the lock back and observe errors.
/// Dropping the handle instead cancels the signal at once and has the monitor
/// close the dedicated connection, which ends the session and with it the
/// lock. This needs no runtime context on the dropping thread.
pub struct LockHandle<C: LockConnection> {
    key: String,
    backend: &'static str,
    liveness: LivenessSignal,
    trigger: CancelOnDrop,
    monitor: Monitor<C>,
}

/// Cancels the liveness signal when the handle goes away unreleased.
struct CancelOnDrop(LivenessTrigger);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

impl<C: LockConnection> LockHandle<C> {
    pub(crate) fn new(
        key: &str,
        connection: C,
        monitor_interval: Duration,
        backend: &'static str,
    ) -> Self {
        let (trigger, liveness) = LivenessTrigger::new();
        let monitor = Monitor::spawn(key, connection, monitor_interval, trigger.clone());

        Self {
            key: key.to_string(),
            backend,
            liveness,
            trigger: CancelOnDrop(trigger),
            monitor,
        }
    }

    /// The lock name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the liveness signal for this lock.
    pub fn liveness(&self) -> LivenessSignal {
        self.liveness.clone()
    }

    /// Shortcut for `self.liveness().is_live()`.
    pub fn is_live(&self) -> bool {
        self.liveness.is_live()
    }

    /// Releases the lock.
    ///
    /// Stops the monitor, sends the release query over the dedicated
    /// connection, returns that connection to its pool and finally cancels
    /// the liveness signal. If the monitor already declared the lock lost,
    /// the query is still attempted and its error returned. After an error
    /// the server-side state of the lock is unknown.
    #[instrument(skip(self), fields(lock.key = %self.key, backend = self.backend))]
    pub async fn release(self) -> LockResult<()> {
        let result = match self.monitor.stop().await {
            Ok(connection) => {
                if self.trigger.0.is_cancelled() {
                    debug!("releasing a lock already reported lost");
                }
                release_on(connection, &self.key).await
            }
            Err(e) => Err(e),
        };

        self.trigger.0.cancel();
        match &result {
            Ok(()) => debug!("lock released"),
            Err(e) => warn!(error = %e, "lock release failed"),
        }
        result
    }
}

/// Runs the release query and frees the connection: back to the pool on a
/// clean answer, closed when the query itself failed.
async fn release_on<C: LockConnection>(mut connection: C, key: &str) -> LockResult<()> {
    match connection.release(key).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(LockError::NotHeld(key.to_string())),
        Err(e) => {
            connection.discard();
            Err(LockError::Backend(e))
        }
    }
}

impl<C: LockConnection> fmt::Debug for LockHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockHandle")
            .field("key", &self.key)
            .field("backend", &self.backend)
            .field("live", &self.liveness.is_live())
            .finish()
    }
}
