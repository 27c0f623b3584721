//! Outbound in-game messaging.

use async_trait::async_trait;
use modmail_sdk::client::{ClientError, CrconClient};
use modmail_sdk::objects::MessagePlayerRequest;
use thiserror::Error;
use tracing::{debug, warn};

/// Sends a private in-game message. Failures stay on this side of the
/// boundary and come back as `false`.
#[async_trait]
pub trait OutboundMessenger: Send + Sync {
    async fn send_message(&self, player_name: &str, text: &str) -> bool;
}

#[derive(Debug, Error)]
enum DeliveryError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("player is not on the server")]
    NotOnline,
}

/// Messenger backed by CRCON `message_player`.
///
/// The player id is resolved from the live roster right before sending, so
/// players who left the server are reported as undeliverable.
pub struct CrconMessenger {
    client: CrconClient,
    sender_label: String,
}

impl CrconMessenger {
    pub fn new(client: CrconClient, sender_label: impl Into<String>) -> Self {
        Self {
            client,
            sender_label: sender_label.into(),
        }
    }

    async fn deliver(&self, player_name: &str, text: &str) -> Result<(), DeliveryError> {
        let roster = self.client.get_live_game_stats().await?;
        let player_id = roster
            .player_id(player_name)
            .ok_or(DeliveryError::NotOnline)?
            .to_string();
        let request = MessagePlayerRequest {
            player_name: player_name.to_string(),
            player_id,
            message: text.to_string(),
            by: self.sender_label.clone(),
        };
        self.client.message_player(&request).await?;
        Ok(())
    }
}

#[async_trait]
impl OutboundMessenger for CrconMessenger {
    async fn send_message(&self, player_name: &str, text: &str) -> bool {
        match self.deliver(player_name, text).await {
            Ok(()) => {
                debug!(player = %player_name, "Delivered in-game message");
                true
            }
            Err(e) => {
                warn!(player = %player_name, error = %e, "Failed to deliver in-game message");
                false
            }
        }
    }
}
