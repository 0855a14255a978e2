//! Cooperative shutdown signal
//!
//! A [`Shutdown`] is handed to every sync cycle and to each parser call.
//! Network operations race against [`Shutdown::triggered`] so an in-flight
//! request is dropped (aborted) as soon as the trigger fires.

use tokio::sync::watch;

/// Creates a connected trigger/signal pair
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Sending half; fires the signal for every clone of the paired [`Shutdown`]
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Fire the shutdown signal
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half; cheap to clone
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// True once the trigger has fired
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the trigger fires; pends forever if it never can
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|fired| *fired).await.is_err() {
            // Trigger dropped without firing
            std::future::pending::<()>().await;
        }
    }
}
