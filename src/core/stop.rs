use tokio::sync::watch;

/// Create a linked stop handle/signal pair.
///
/// The handle side belongs to whoever owns the run (the controller); the
/// signal side is cloned into every loop that must unwind on request. A
/// dropped handle also reads as stopped, so an abandoned run cannot leak its
/// scan loop.
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopSignal { rx })
}

/// Requests termination of a running scan or consumer loop.
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    /// Signal every attached [`StopSignal`] to unwind.
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }

    /// Attach another signal to this handle.
    pub fn signal(&self) -> StopSignal {
        StopSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observer side of a [`StopHandle`].
#[derive(Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// Non-blocking check, polled at the top of every scan iteration.
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once stop is requested (or the handle is dropped).
    pub async fn stopped(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
