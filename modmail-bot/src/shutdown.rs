//! Signal handling for graceful shutdown and ticket policy reload.

use crate::config::ConfigLoader;
use modmail_core::config::PolicyPublisher;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Notify;

/// Creates a future that completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C).
pub async fn shutdown_signal() {
    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!("Failed to install signal handlers: {}, falling back to Ctrl+C", e);
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl+C: {}", e);
                }
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

/// Spawns a task that listens for SIGHUP, re-reads the config file and
/// publishes the new ticket policy.
///
/// Connection settings are not reloaded; they need a restart.
/// Returns a Notify that can be used to stop the task.
pub fn spawn_policy_reload_handler(
    config_loader: Arc<ConfigLoader>,
    publisher: PolicyPublisher,
) -> Arc<Notify> {
    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_notify_clone = shutdown_notify.clone();

    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(sighup) => sighup,
            Err(e) => {
                tracing::error!("Failed to install SIGHUP handler, reload disabled: {}", e);
                return;
            }
        };

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    tracing::info!("Received SIGHUP, reloading ticket policy");
                    match config_loader.reload_policy() {
                        Ok(policy) => {
                            if publisher.send(Arc::new(policy)).is_err() {
                                tracing::warn!("Ticket desk is gone, dropping reloaded policy");
                                break;
                            }
                            tracing::info!("Ticket policy reloaded successfully");
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload configuration: {}", e);
                        }
                    }
                }
                _ = shutdown_notify_clone.notified() => {
                    tracing::debug!("Policy reload handler shutting down");
                    break;
                }
            }
        }
    });

    shutdown_notify
}
