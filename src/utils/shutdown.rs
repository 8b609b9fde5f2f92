use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Cooperative shutdown signal shared between the accept loop and every
/// per-connection task.
#[derive(Debug, Clone, Default)]
pub struct SignalOfStop {
    token: CancellationToken,
}

impl SignalOfStop {
    pub fn new() -> SignalOfStop {
        SignalOfStop {
            token: CancellationToken::new(),
        }
    }

    /// Spawn a task that is dropped as soon as the signal fires.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = future => {}
            }
        });
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn wait_cancellation(&self) {
        self.token.cancelled().await
    }
}
