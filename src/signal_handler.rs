use std::io;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Shared shutdown flag, tripped by SIGINT, SIGTERM or SIGHUP.
#[derive(Clone)]
pub struct SignalHandler {
    shutdown: Arc<watch::Sender<bool>>,
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown: Arc::new(shutdown),
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn request_shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            info!("Graceful shutdown requested");
        }
    }

    /// Resolves once shutdown has been requested (immediately if it already was).
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
    }

    pub fn start_signal_monitoring(&self) -> io::Result<JoinHandle<()>> {
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sighup = signal(SignalKind::hangup())?;
        let handler = self.clone();

        Ok(tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => warn!("Received SIGINT signal"),
                _ = sigterm.recv() => warn!("Received SIGTERM signal"),
                _ = sighup.recv() => warn!("Received SIGHUP signal"),
                _ = handler.wait_for_shutdown() => return,
            }
            handler.request_shutdown();
        }))
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_request_shutdown_wakes_waiters() {
        let handler = SignalHandler::new();
        assert!(!handler.is_shutdown_requested());

        let waiter = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.wait_for_shutdown().await })
        };

        handler.request_shutdown();
        handler.request_shutdown();

        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(handler.is_shutdown_requested());

        // already requested: resolves immediately
        tokio::time::timeout(Duration::from_millis(100), handler.wait_for_shutdown())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_monitor_task_ends_on_manual_shutdown() {
        let handler = SignalHandler::new();
        let task = handler.start_signal_monitoring().unwrap();

        handler.request_shutdown();
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }
}
