//! Player roster and direct-message payloads.

use serde::{Deserialize, Serialize};

/// `GET /api/get_live_game_stats` result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveGameStats {
    #[serde(default)]
    pub stats: Vec<PlayerStat>,
}

impl LiveGameStats {
    /// Platform id of the online player with this exact display name.
    pub fn player_id(&self, player_name: &str) -> Option<&str> {
        self.stats
            .iter()
            .find(|s| s.player == player_name)
            .map(|s| s.player_id.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStat {
    pub player: String,
    pub player_id: String,
}

/// Body of `POST /api/message_player`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePlayerRequest {
    pub player_name: String,
    pub player_id: String,
    pub message: String,
    /// Sender label shown in the CRCON audit log.
    pub by: String,
}
