use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Cancels a token on SIGTERM or SIGINT (Ctrl-C elsewhere).
pub struct ShutdownSignal {
    tracker: TaskTracker,
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn listen() -> Result<Self, std::io::Error> {
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            let cancel = token.clone();
            tracker.spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("SIGTERM received, shutting down"),
                    _ = sigint.recv() => tracing::info!("SIGINT received, shutting down"),
                    _ = cancel.cancelled() => return,
                }
                cancel.cancel();
            });
        }

        #[cfg(not(unix))]
        {
            let cancel = token.clone();
            tracker.spawn(async move {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            tracing::error!("Unable to listen for shutdown signal: {}", e);
                            return;
                        }
                        tracing::info!("Ctrl-C received, shutting down");
                    }
                    _ = cancel.cancelled() => return,
                }
                cancel.cancel();
            });
        }

        tracker.close();
        Ok(Self { tracker, token })
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Resolves once shutdown was requested and the listener task finished.
    pub async fn wait(&self) {
        self.token.cancelled().await;
        self.tracker.wait().await;
    }
}
