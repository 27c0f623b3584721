//! IngestRunner processor.
//!
//! The IngestRunner is responsible for:
//! - Connecting the [`EventSource`], retrying with exponential backoff
//! - Polling (or receiving pushed batches) until the connection drops, then
//!   waiting out the same backoff before reconnecting
//! - Forwarding every accepted `ChatEvent` to the ticket desk
//!
//! Shutdown is checked between batches and interrupts any wait. Events of a
//! batch already received are always forwarded in full.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::events::ChatEventSender;
use crate::ingest::{EventSource, IngestError, Session};
use crate::utils::backoff::Backoff;

pub struct IngestRunner {
    source: EventSource,
    chat_tx: ChatEventSender,
    poll_interval: Duration,
    backoff: Backoff,
}

impl IngestRunner {
    pub fn new(source: EventSource, chat_tx: ChatEventSender, config: &IngestConfig) -> Self {
        Self {
            source,
            chat_tx,
            poll_interval: config.poll_interval,
            backoff: Backoff::new(config.backoff),
        }
    }

    /// Run until shutdown is signaled or the desk goes away.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(transport = %self.source.kind(), "IngestRunner started");

        'session: loop {
            let Some(mut session) = self.connect(&mut shutdown_rx).await else {
                break;
            };

            loop {
                let result = tokio::select! {
                    biased;

                    // Check for shutdown
                    res = shutdown_rx.changed() => {
                        if res.is_err() || *shutdown_rx.borrow() {
                            info!("IngestRunner received shutdown signal");
                            break 'session;
                        }
                        continue;
                    }

                    result = self.source.poll_or_receive(&mut session) => result,
                };

                match result {
                    Ok(events) => {
                        if self.backoff.attempt() > 0 {
                            info!(attempts = self.backoff.attempt(), "Log source recovered");
                            self.backoff.reset();
                        }
                        if !events.is_empty() {
                            debug!(
                                count = events.len(),
                                cursor = ?self.source.cursor(),
                                "Forwarding chat events"
                            );
                        }
                        for event in events {
                            if self.chat_tx.send(event).await.is_err() {
                                info!("ChatEvent channel closed");
                                break 'session;
                            }
                        }
                    }
                    Err(IngestError::Malformed(e)) => {
                        warn!(error = %e, "Dropped malformed log batch");
                    }
                    Err(e) => {
                        let delay = self.backoff.next_delay();
                        warn!(
                            error = %e,
                            attempt = self.backoff.attempt(),
                            retry_in_ms = delay.as_millis() as u64,
                            "Lost connection to log source, reconnecting"
                        );
                        if let Session::Stream(stream) = session {
                            stream.close().await;
                        }
                        if !sleep_or_shutdown(delay, &mut shutdown_rx).await {
                            break 'session;
                        }
                        continue 'session;
                    }
                }

                if !self.source.is_push()
                    && !sleep_or_shutdown(self.poll_interval, &mut shutdown_rx).await
                {
                    break 'session;
                }
            }
        }

        info!(cursor = ?self.source.cursor(), "IngestRunner shutdown complete");
    }

    /// Connect, retrying forever. `None` means shutdown was requested.
    async fn connect(&mut self, shutdown_rx: &mut watch::Receiver<bool>) -> Option<Session> {
        loop {
            if *shutdown_rx.borrow() {
                return None;
            }

            let result = tokio::select! {
                biased;

                res = shutdown_rx.changed() => {
                    if res.is_err() || *shutdown_rx.borrow() {
                        return None;
                    }
                    continue;
                }

                result = self.source.connect() => result,
            };

            match result {
                // The backoff is reset by the first good batch, not here: a
                // handshake can succeed while the log endpoint keeps failing.
                Ok(session) => return Some(session),
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    warn!(
                        error = %e,
                        attempt = self.backoff.attempt(),
                        retry_in_ms = delay.as_millis() as u64,
                        "Failed to connect to log source"
                    );
                    if !sleep_or_shutdown(delay, shutdown_rx).await {
                        return None;
                    }
                }
            }
        }
    }
}

/// Sleep for `duration`. Returns `false` if shutdown fired meanwhile.
async fn sleep_or_shutdown(duration: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        biased;

        res = shutdown_rx.changed() => res.is_ok() && !*shutdown_rx.borrow(),
        _ = tokio::time::sleep(duration) => true,
    }
}
