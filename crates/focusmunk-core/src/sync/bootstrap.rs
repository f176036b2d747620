//! One-shot latch opened after the startup refresh.

use tokio::sync::watch;

/// Receiving side of the bootstrap latch.
///
/// Cheap to clone. Waiting returns immediately once the first refresh after
/// process start has finished, whatever its outcome.
#[derive(Debug, Clone)]
pub struct BootstrapSignal {
    rx: watch::Receiver<bool>,
}

impl BootstrapSignal {
    pub(crate) fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// A latch that is already open. For callers that never bootstrap.
    pub fn ready() -> Self {
        let (_tx, rx) = watch::channel(true);
        Self { rx }
    }

    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until bootstrap has completed. Returns at once if the sync client
    /// was dropped, so a navigation can never hang on a dead latch.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|done| *done).await;
    }
}
