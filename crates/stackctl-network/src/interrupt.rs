//! External interrupt signal for in-flight waits

use tokio::sync::watch;

/// Sending side, owned by whoever listens for Ctrl-C
pub struct InterruptHandle {
    tx: watch::Sender<bool>,
}

/// Receiving side, cloned into every wait that must be abortable
#[derive(Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl InterruptHandle {
    /// Create a connected handle and interrupt pair
    pub fn new() -> (Self, Interrupt) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, Interrupt { rx })
    }

    /// Fire the interrupt; later waits observe it immediately
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Interrupt {
    /// An interrupt that never fires
    pub fn never() -> Self {
        let (_, interrupt) = InterruptHandle::new();
        interrupt
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the interrupt fires; pending forever if it cannot
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // handle dropped without firing
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::never()
    }
}
