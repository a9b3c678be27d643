use tokio::sync::oneshot;

/// Stop handles for the two tasks attached to an active call.
///
/// Cancellation is idempotent: the senders are taken on first use, so every
/// later `cancel` is a no-op. Dropping the struct cancels as well (the task
/// side selects on the receiver, which resolves when the sender is dropped),
/// so replacing or discarding the active slot can never leak a running task.
#[derive(Debug)]
pub(crate) struct SessionTimers {
    poller_stop: Option<oneshot::Sender<()>>,
    watchdog_stop: Option<oneshot::Sender<()>>,
}

impl SessionTimers {
    pub(crate) fn new(
        poller_stop: oneshot::Sender<()>,
        watchdog_stop: oneshot::Sender<()>,
    ) -> Self {
        Self {
            poller_stop: Some(poller_stop),
            watchdog_stop: Some(watchdog_stop),
        }
    }

    /// Stop the poller and the watchdog. Safe to call any number of times.
    pub(crate) fn cancel(&mut self) {
        if let Some(stop) = self.poller_stop.take() {
            let _ = stop.send(());
        }
        if let Some(stop) = self.watchdog_stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel();
    }
}
