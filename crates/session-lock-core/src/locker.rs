//! Entry point for acquiring locks.

use std::fmt;
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, field, instrument, Span};

use crate::error::{LockError, LockResult};
use crate::handle::LockHandle;
use crate::timeout::WaitTimeout;
use crate::traits::{AcquireOutcome, ConnectionProvider, LockConnection};

/// Default period between liveness checks of a held lock.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(1);

/// Handle type produced by a [`Locker`] over provider `P`.
pub type ProviderLockHandle<P> = LockHandle<<P as ConnectionProvider>::Connection>;

/// Builder for [`Locker`] configuration.
pub struct LockerBuilder<P> {
    provider: P,
    monitor_interval: Duration,
}

impl<P: ConnectionProvider> LockerBuilder<P> {
    /// Creates a new builder around a connection provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
        }
    }

    /// Sets how often each held lock checks its connection.
    ///
    /// A lost session is noticed within roughly one interval plus one round
    /// trip. Must be non-zero.
    pub fn monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Builds the locker.
    pub fn build(self) -> LockResult<Locker<P>> {
        if self.monitor_interval.is_zero() {
            return Err(LockError::InvalidConfig(
                "monitor interval must be greater than zero".to_string(),
            ));
        }

        Ok(Locker {
            provider: Arc::new(self.provider),
            monitor_interval: self.monitor_interval,
        })
    }
}

/// Acquires named locks through a connection provider.
///
/// Holds only immutable configuration; clones share the provider and the
/// locker can be used from any number of tasks at once.
///
/// # Example
///
/// ```rust,ignore
/// let locker = Locker::new(provider);
/// let handle = locker.obtain("nightly-report").await?;
/// generate_report().await;
/// handle.release().await?;
/// ```
pub struct Locker<P> {
    provider: Arc<P>,
    monitor_interval: Duration,
}

impl<P> Clone for Locker<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            monitor_interval: self.monitor_interval,
        }
    }
}

impl<P> fmt::Debug for Locker<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locker")
            .field("monitor_interval", &self.monitor_interval)
            .finish_non_exhaustive()
    }
}

impl<P: ConnectionProvider> Locker<P> {
    /// Creates a locker with the default monitor interval.
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
        }
    }

    /// Returns a new builder for configuring the locker.
    pub fn builder(provider: P) -> LockerBuilder<P> {
        LockerBuilder::new(provider)
    }

    /// How often each handle's monitor pings its connection.
    pub fn monitor_interval(&self) -> Duration {
        self.monitor_interval
    }

    /// The provider dedicated connections are checked out from.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Acquires the lock, waiting as long as it takes.
    pub async fn obtain(&self, key: &str) -> LockResult<ProviderLockHandle<P>> {
        self.acquire(key, WaitTimeout::INFINITE, future::pending())
            .await
    }

    /// Acquires the lock, letting the database wait at most `timeout`.
    ///
    /// Accepts whole seconds (`-1` forever, `0` try once), a `Duration`, or
    /// an `Option<Duration>`.
    pub async fn obtain_timeout(
        &self,
        key: &str,
        timeout: impl Into<WaitTimeout>,
    ) -> LockResult<ProviderLockHandle<P>> {
        self.acquire(key, timeout.into(), future::pending()).await
    }

    /// Acquires the lock without a database-side bound, giving up when
    /// `cancel` completes.
    ///
    /// Cancellation is best-effort: the client stops waiting and closes the
    /// connection, but a wait already running on the server is not
    /// guaranteed to end at that instant.
    pub async fn obtain_cancellable<F>(
        &self,
        key: &str,
        cancel: F,
    ) -> LockResult<ProviderLockHandle<P>>
    where
        F: Future<Output = ()> + Send,
    {
        self.acquire(key, WaitTimeout::INFINITE, cancel).await
    }

    /// Acquires the lock with a database-side bound and a client-side
    /// cancellation. See [`obtain_cancellable`](Self::obtain_cancellable).
    pub async fn obtain_timeout_cancellable<F>(
        &self,
        key: &str,
        timeout: impl Into<WaitTimeout>,
        cancel: F,
    ) -> LockResult<ProviderLockHandle<P>>
    where
        F: Future<Output = ()> + Send,
    {
        self.acquire(key, timeout.into(), cancel).await
    }

    /// Makes a single attempt without waiting. Returns `Ok(None)` when the
    /// lock is held elsewhere.
    pub async fn try_obtain(&self, key: &str) -> LockResult<Option<ProviderLockHandle<P>>> {
        match self.acquire(key, WaitTimeout::ZERO, future::pending()).await {
            Ok(handle) => Ok(Some(handle)),
            Err(LockError::Timeout(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reports whether any session holds the lock right now.
    pub async fn is_locked(&self, key: &str) -> LockResult<bool> {
        self.is_locked_cancellable(key, future::pending()).await
    }

    /// Like [`is_locked`](Self::is_locked), giving up when `cancel`
    /// completes.
    ///
    /// Uses a connection for this one query only; it goes back to the pool
    /// before the call returns.
    #[instrument(skip_all, fields(lock.key = %key, backend = self.provider.backend()))]
    pub async fn is_locked_cancellable<F>(&self, key: &str, cancel: F) -> LockResult<bool>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(cancel);
        let mut connection = self.checkout(cancel.as_mut()).await?;

        let answer = tokio::select! {
            biased;
            _ = cancel.as_mut() => None,
            result = connection.is_held(key) => Some(result),
        };

        match answer {
            Some(Ok(held)) => {
                drop(connection);
                Ok(held)
            }
            Some(Err(e)) => {
                connection.discard();
                Err(LockError::Backend(e))
            }
            None => {
                connection.discard();
                Err(LockError::Cancelled)
            }
        }
    }

    #[instrument(
        skip_all,
        fields(
            lock.key = %key,
            backend = self.provider.backend(),
            timeout = %timeout,
            acquired = field::Empty,
        )
    )]
    async fn acquire<F>(
        &self,
        key: &str,
        timeout: WaitTimeout,
        cancel: F,
    ) -> LockResult<ProviderLockHandle<P>>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(cancel);
        let mut connection = self.checkout(cancel.as_mut()).await?;

        // Cancellation is polled first so that a query failing because the
        // caller gave up is reported as a cancellation.
        let answer = tokio::select! {
            biased;
            _ = cancel.as_mut() => None,
            result = connection.acquire(key, timeout) => Some(result),
        };

        let outcome = match answer {
            Some(Ok(outcome)) => outcome,
            Some(Err(e)) => {
                connection.discard();
                Span::current().record("acquired", false);
                return Err(LockError::Backend(e));
            }
            None => {
                // The server may still be waiting on our behalf; closing the
                // session is the only way to withdraw.
                connection.discard();
                Span::current().record("acquired", false);
                return Err(LockError::Cancelled);
            }
        };

        Span::current().record("acquired", outcome == AcquireOutcome::Acquired);
        match outcome {
            AcquireOutcome::Acquired => {
                debug!("lock acquired");
                Ok(LockHandle::new(
                    key,
                    connection,
                    self.monitor_interval,
                    self.provider.backend(),
                ))
            }
            AcquireOutcome::TimedOut => Err(LockError::Timeout(timeout)),
            AcquireOutcome::InternalError => Err(LockError::Internal),
        }
    }

    async fn checkout<F>(&self, cancel: Pin<&mut F>) -> LockResult<P::Connection>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::select! {
            biased;
            _ = cancel => Err(LockError::Cancelled),
            result = self.provider.connect() => result.map_err(LockError::Connection),
        }
    }
}
