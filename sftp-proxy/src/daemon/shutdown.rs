//! Shutdown signal handling for SIGTERM and SIGINT.
//!
//! The signal only stops new runs from being scheduled; a run already in
//! progress finishes its current path before the process exits.

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Shutdown coordinator
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { shutdown_tx }
    }

    /// Get a shutdown receiver
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Request shutdown without an OS signal.
    pub fn trigger(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Wait for SIGTERM, SIGINT or [`ShutdownCoordinator::trigger`].
    pub async fn wait_for_signal(&self) {
        let mut triggered = self.subscribe();

        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), stopping scheduler...");
            }
            _ = terminate => {
                info!("Received SIGTERM, stopping scheduler...");
            }
            _ = triggered.recv() => {
                info!("Shutdown requested");
                return;
            }
        }

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("No shutdown listeners: {}", e);
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
