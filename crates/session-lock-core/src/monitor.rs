//! Background liveness monitor for a held lock.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn, Instrument};

use crate::error::{LockError, LockResult};
use crate::liveness::LivenessTrigger;
use crate::traits::LockConnection;

/// Channel the monitor answers a stop request on.
type Reply<C> = oneshot::Sender<C>;

/// Owns the dedicated connection while the lock is held and pings it every
/// interval.
///
/// [`stop`](Self::stop) gets the connection back once any ping in flight has
/// finished. Dropping the monitor without stopping it closes the connection
/// instead, so the server frees whatever lock the session still holds.
pub(crate) struct Monitor<C> {
    stop: oneshot::Sender<Reply<C>>,
}

impl<C: LockConnection> Monitor<C> {
    pub(crate) fn spawn(
        key: &str,
        connection: C,
        interval: Duration,
        trigger: LivenessTrigger,
    ) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let span = tracing::debug_span!("liveness_monitor", lock.key = %key);
        tokio::spawn(run(connection, interval, trigger, stop_rx).instrument(span));

        Self { stop: stop_tx }
    }

    /// Stops the task and takes the connection back.
    pub(crate) async fn stop(self) -> LockResult<C> {
        let (reply_tx, reply_rx) = oneshot::channel();
        // If the task is gone the reply sender is dropped with the message
        // and the receive below fails.
        let _ = self.stop.send(reply_tx);
        reply_rx.await.map_err(|_| {
            LockError::Backend("liveness monitor exited without returning the connection".into())
        })
    }
}

async fn run<C: LockConnection>(
    mut connection: C,
    interval: Duration,
    trigger: LivenessTrigger,
    mut stop: oneshot::Receiver<Reply<C>>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reply = loop {
        tokio::select! {
            biased;
            reply = &mut stop => break reply.ok(),
            _ = ticker.tick() => {
                if let Err(e) = connection.ping().await {
                    warn!(error = %e, "liveness check failed, lock presumed lost");
                    trigger.cancel();
                    // Keep the connection until the handle decides what to
                    // do with it.
                    break (&mut stop).await.ok();
                }
            }
        }
    };

    match reply {
        Some(reply) => {
            debug!("liveness monitor stopped");
            if let Err(connection) = reply.send(connection) {
                connection.discard();
            }
        }
        None => {
            debug!("lock handle dropped, closing its connection");
            connection.discard();
        }
    }
}
