//! One-way liveness signal shared by a lock handle and its monitor.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Observer side of a lock's liveness.
///
/// Starts out live and flips to lost at most once, either when the lock is
/// released or when the liveness monitor finds the dedicated connection
/// dead. Cheap to clone; every clone observes the same transition.
///
/// # Example
///
/// ```rust,ignore
/// let liveness = handle.liveness();
/// tokio::select! {
///     _ = liveness.lost() => {
///         eprintln!("lock lost, abandoning work");
///     }
///     _ = do_work() => {}
/// }
/// handle.release().await?;
/// ```
#[derive(Debug, Clone)]
pub struct LivenessSignal {
    receiver: watch::Receiver<bool>,
}

impl LivenessSignal {
    /// Returns `true` while the holder still believes it owns the lock.
    pub fn is_live(&self) -> bool {
        !*self.receiver.borrow()
    }

    /// Returns `true` once the signal has been cancelled.
    pub fn is_lost(&self) -> bool {
        !self.is_live()
    }

    /// Resolves once the signal is cancelled.
    ///
    /// The returned future owns its own receiver, so it can be handed to
    /// another task or used as the cancellation of a further acquisition.
    pub fn lost(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut receiver = self.receiver.clone();
        async move {
            // A closed channel means every trigger is gone; treat as lost.
            let _ = receiver.wait_for(|lost| *lost).await;
        }
    }
}

/// Cancelling side of a [`LivenessSignal`].
///
/// Held by the lock handle and its monitor. Whichever calls
/// [`cancel`](Self::cancel) first performs the transition; later calls are
/// no-ops.
#[derive(Debug, Clone)]
pub(crate) struct LivenessTrigger {
    sender: Arc<watch::Sender<bool>>,
}

impl LivenessTrigger {
    pub(crate) fn new() -> (Self, LivenessSignal) {
        let (sender, receiver) = watch::channel(false);
        (
            Self {
                sender: Arc::new(sender),
            },
            LivenessSignal { receiver },
        )
    }

    /// Marks the lock as lost. Returns `true` only for the call that
    /// performed the transition.
    pub(crate) fn cancel(&self) -> bool {
        self.sender.send_if_modified(|lost| {
            if *lost {
                false
            } else {
                *lost = true;
                true
            }
        })
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}
