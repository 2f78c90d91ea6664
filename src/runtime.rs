//! Tokio runtime configuration and shutdown plumbing for the binary
//!
//! This module provides:
//! - Runtime selection for the coordinator and worker roles
//! - Process signal handling
//! - The shutdown flag shared by coordinator, workers and connections

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of worker threads
    worker_threads: usize,
}

impl RuntimeConfig {
    /// Multi-threaded runtime for the coordinator
    ///
    /// Sized to the available CPUs so in-process workers can spread out.
    #[must_use]
    pub fn coordinator() -> Self {
        let worker_threads = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1);
        Self { worker_threads }
    }

    /// Single cooperative event loop for a worker process
    #[must_use]
    pub const fn worker() -> Self {
        Self { worker_threads: 1 }
    }

    #[must_use]
    pub const fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    #[must_use]
    pub const fn is_single_threaded(&self) -> bool {
        self.worker_threads == 1
    }

    /// Build the tokio runtime
    ///
    /// # Errors
    /// Returns error if runtime creation fails
    pub fn build_runtime(self) -> Result<tokio::runtime::Runtime> {
        let rt = if self.is_single_threaded() {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
        } else {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(self.worker_threads)
                .enable_all()
                .build()?
        };
        Ok(rt)
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM on Unix)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Create the global shutdown flag
///
/// The sender flips it to `true` once; every clone of the receiver sees it.
#[must_use]
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Flip the shutdown flag when a process signal arrives
pub fn spawn_shutdown_handler(shutdown: watch::Sender<bool>) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        let _ = shutdown.send(true);
    });
}

/// Resolve once shutdown has been requested
///
/// If the sender is dropped without requesting shutdown this never
/// resolves: nobody is left who could ask for it.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_worker_runtime_is_single_threaded() {
        let config = RuntimeConfig::worker();
        assert!(config.is_single_threaded());
        assert_eq!(config.worker_threads(), 1);
    }

    #[test]
    fn test_coordinator_runtime_has_threads() {
        assert!(RuntimeConfig::coordinator().worker_threads() >= 1);
    }

    #[test]
    fn test_build_worker_runtime() {
        let rt = RuntimeConfig::worker().build_runtime().unwrap();
        assert_eq!(rt.block_on(async { 1 + 1 }), 2);
    }

    #[tokio::test]
    async fn test_shutdown_requested_resolves() {
        let (tx, mut rx) = shutdown_channel();
        let waiter = tokio::spawn(async move { shutdown_requested(&mut rx).await });
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_already_requested() {
        let (tx, mut rx) = shutdown_channel();
        tx.send(true).unwrap();
        shutdown_requested(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_never_resolves() {
        let (tx, mut rx) = shutdown_channel();
        drop(tx);
        let result =
            tokio::time::timeout(Duration::from_secs(5), shutdown_requested(&mut rx)).await;
        assert!(result.is_err());
    }
}
