//! Roster lookup and direct messages.

use super::{ClientError, CrconClient, parse_response};
use crate::objects::{LiveGameStats, MessagePlayerRequest};

impl CrconClient {
    /// `GET /api/get_live_game_stats` – players currently on the server.
    pub async fn get_live_game_stats(&self) -> Result<LiveGameStats, ClientError> {
        let url = self.endpoint("api/get_live_game_stats")?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /api/message_player` – in-game private message.
    pub async fn message_player(&self, request: &MessagePlayerRequest) -> Result<(), ClientError> {
        let url = self.endpoint("api/message_player")?;
        let resp = self
            .http
            .post(url)
            .json(request)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let _: serde_json::Value = parse_response(resp).await?;
        Ok(())
    }
}
