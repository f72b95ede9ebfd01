/*!
 * Cooperative cancellation shared by the workers of one run.
 */

use std::sync::Arc;
use tokio::sync::watch;

/// One-way signal telling outstanding workers to stop
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSignal {
    /// Create an untriggered signal
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Trigger the signal, waking every waiter
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Whether the signal has been triggered
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once the signal is triggered
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this can't fail
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}
