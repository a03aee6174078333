//! In-memory advisory-lock server for exercising the locker without a
//! database.
//!
//! Locks are owned by sessions exactly as with `GET_LOCK`: closing or killing
//! a session drops its locks, and a killed session fails every later query.

#![allow(dead_code)]

use session_lock_core::error::BoxError;
use session_lock_core::locker::Locker;
use session_lock_core::timeout::WaitTimeout;
use session_lock_core::traits::{AcquireOutcome, ConnectionProvider, LockConnection};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Longest name the mock accepts, mirroring MySQL.
const MAX_NAME_LENGTH: usize = 64;

#[derive(Default)]
struct ServerState {
    /// Lock name to owning session id.
    locks: Mutex<HashMap<String, u64>>,
    /// Session id to its "connection is dead" flag.
    sessions: Mutex<HashMap<u64, Arc<AtomicBool>>>,
    released: Notify,
    next_session: AtomicU64,
    checked_out: AtomicUsize,
    discarded: AtomicUsize,
    pings: AtomicUsize,
    pings_started: AtomicUsize,
    ping_delay_ms: AtomicU64,
    /// Query log, only filled once `log_queries` was called.
    log: Mutex<Option<Vec<&'static str>>>,
    refuse_connections: AtomicBool,
    internal_error_next: AtomicBool,
}

impl ServerState {
    fn drop_session_locks(&self, session: u64) {
        self.locks
            .lock()
            .unwrap()
            .retain(|_, owner| *owner != session);
        self.released.notify_waiters();
    }

    fn record(&self, event: &'static str) {
        if let Some(log) = self.log.lock().unwrap().as_mut() {
            log.push(event);
        }
    }
}

/// Shared in-memory server. Clones refer to the same server.
#[derive(Clone, Default)]
pub struct MockServer {
    state: Arc<ServerState>,
}

impl MockServer {
    /// Creates an empty server.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(&self) -> MockProvider {
        MockProvider {
            state: Arc::clone(&self.state),
        }
    }

    /// Locker with the given monitor interval.
    pub fn locker(&self, monitor_interval: Duration) -> Locker<MockProvider> {
        Locker::builder(self.provider())
            .monitor_interval(monitor_interval)
            .build()
            .unwrap()
    }

    /// Session currently owning `key`.
    pub fn holder(&self, key: &str) -> Option<u64> {
        self.state.locks.lock().unwrap().get(key).copied()
    }

    /// Kills the session holding `key`, like `KILL <id>`: its locks vanish
    /// and its connection fails from now on. Returns `false` if nobody held
    /// the key.
    pub fn kill_holder(&self, key: &str) -> bool {
        let Some(session) = self.holder(key) else {
            return false;
        };
        if let Some(broken) = self.state.sessions.lock().unwrap().get(&session) {
            broken.store(true, Ordering::SeqCst);
        }
        self.state.drop_session_locks(session);
        true
    }

    /// Removes `key` from its owner without touching the session.
    pub fn force_unlock(&self, key: &str) {
        self.state.locks.lock().unwrap().remove(key);
        self.state.released.notify_waiters();
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.state.refuse_connections.store(refuse, Ordering::SeqCst);
    }

    /// Makes the next acquire query answer with the internal-error sentinel.
    pub fn fail_next_acquire(&self) {
        self.state.internal_error_next.store(true, Ordering::SeqCst);
    }

    /// Connections handed out and not yet returned or closed.
    pub fn checked_out(&self) -> usize {
        self.state.checked_out.load(Ordering::SeqCst)
    }

    /// Connections closed instead of being returned to the pool.
    pub fn discarded(&self) -> usize {
        self.state.discarded.load(Ordering::SeqCst)
    }

    /// Successful pings served so far.
    pub fn pings(&self) -> usize {
        self.state.pings.load(Ordering::SeqCst)
    }

    /// Pings received so far, including ones still in flight.
    pub fn pings_started(&self) -> usize {
        self.state.pings_started.load(Ordering::SeqCst)
    }

    /// Makes every ping take `delay` before answering.
    pub fn set_ping_delay(&self, delay: Duration) {
        self.state
            .ping_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Starts recording `ping_start`, `ping_end` and `release` queries.
    pub fn log_queries(&self) {
        self.state.log.lock().unwrap().get_or_insert_with(Vec::new);
    }

    /// Queries recorded since `log_queries`.
    pub fn query_log(&self) -> Vec<&'static str> {
        self.state.log.lock().unwrap().clone().unwrap_or_default()
    }
}

/// Connection provider backed by a [`MockServer`].
pub struct MockProvider {
    state: Arc<ServerState>,
}

impl ConnectionProvider for MockProvider {
    type Connection = MockConnection;

    fn backend(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self) -> Result<MockConnection, BoxError> {
        if self.state.refuse_connections.load(Ordering::SeqCst) {
            return Err("connection refused".into());
        }

        let session = self.state.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        let broken = Arc::new(AtomicBool::new(false));
        self.state
            .sessions
            .lock()
            .unwrap()
            .insert(session, Arc::clone(&broken));
        self.state.checked_out.fetch_add(1, Ordering::SeqCst);

        Ok(MockConnection {
            session,
            broken,
            state: Arc::clone(&self.state),
        })
    }
}

/// One mock session.
pub struct MockConnection {
    session: u64,
    broken: Arc<AtomicBool>,
    state: Arc<ServerState>,
}

impl MockConnection {
    fn check_alive(&self) -> Result<(), BoxError> {
        if self.broken.load(Ordering::SeqCst) {
            Err("connection reset by peer".into())
        } else {
            Ok(())
        }
    }

    /// Takes the lock if free (or already ours).
    fn try_take(&self, key: &str) -> bool {
        let mut locks = self.state.locks.lock().unwrap();
        match locks.get(key) {
            None => {
                locks.insert(key.to_string(), self.session);
                true
            }
            Some(owner) => *owner == self.session,
        }
    }
}

impl LockConnection for MockConnection {
    async fn acquire(&mut self, key: &str, timeout: WaitTimeout) -> Result<AcquireOutcome, BoxError> {
        self.check_alive()?;
        if key.chars().count() > MAX_NAME_LENGTH {
            return Err(format!("incorrect user-level lock name '{key}'").into());
        }
        if self.state.internal_error_next.swap(false, Ordering::SeqCst) {
            return Ok(AcquireOutcome::InternalError);
        }

        let deadline = timeout.as_duration().map(|d| Instant::now() + d);
        loop {
            // Register for wake-ups before checking so a release in between
            // is not missed.
            let notified = self.state.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_take(key) {
                return Ok(AcquireOutcome::Acquired);
            }

            match deadline {
                None => notified.await,
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(AcquireOutcome::TimedOut);
                    }
                }
            }
            self.check_alive()?;
        }
    }

    async fn release(&mut self, key: &str) -> Result<bool, BoxError> {
        self.check_alive()?;
        self.state.record("release");
        let released = {
            let mut locks = self.state.locks.lock().unwrap();
            if locks.get(key) == Some(&self.session) {
                locks.remove(key);
                true
            } else {
                false
            }
        };
        if released {
            self.state.released.notify_waiters();
        }
        Ok(released)
    }

    async fn is_held(&mut self, key: &str) -> Result<bool, BoxError> {
        self.check_alive()?;
        Ok(self.state.locks.lock().unwrap().contains_key(key))
    }

    async fn ping(&mut self) -> Result<(), BoxError> {
        self.check_alive()?;
        self.state.pings_started.fetch_add(1, Ordering::SeqCst);
        self.state.record("ping_start");

        let delay = self.state.ping_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.state.record("ping_end");
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn discard(self) {
        self.broken.store(true, Ordering::SeqCst);
        self.state.discarded.fetch_add(1, Ordering::SeqCst);
        self.state.drop_session_locks(self.session);
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.state.checked_out.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sessions_own_their_locks() {
        let server = MockServer::new();
        let provider = server.provider();
        let mut first = provider.connect().await.unwrap();
        let mut second = provider.connect().await.unwrap();

        assert_eq!(
            first.acquire("k", WaitTimeout::ZERO).await.unwrap(),
            AcquireOutcome::Acquired
        );
        assert_eq!(
            second.acquire("k", WaitTimeout::ZERO).await.unwrap(),
            AcquireOutcome::TimedOut
        );
        assert!(!second.release("k").await.unwrap());
        assert!(first.release("k").await.unwrap());
        assert_eq!(server.checked_out(), 2);
    }

    #[tokio::test]
    async fn test_discard_drops_session_locks() {
        let server = MockServer::new();
        let mut conn = server.provider().connect().await.unwrap();
        conn.acquire("k", WaitTimeout::ZERO).await.unwrap();
        assert!(server.holder("k").is_some());

        conn.discard();
        assert!(server.holder("k").is_none());
        assert_eq!(server.checked_out(), 0);
        assert_eq!(server.discarded(), 1);
    }

    #[tokio::test]
    async fn test_query_log_is_opt_in() {
        let server = MockServer::new();
        let mut conn = server.provider().connect().await.unwrap();

        conn.ping().await.unwrap();
        assert!(server.query_log().is_empty());

        server.log_queries();
        server.set_ping_delay(Duration::from_millis(10));
        conn.ping().await.unwrap();
        conn.release("k").await.unwrap();
        assert_eq!(server.query_log(), vec!["ping_start", "ping_end", "release"]);
        assert_eq!(server.pings(), 2);
    }
}
