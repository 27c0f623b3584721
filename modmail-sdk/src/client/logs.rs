//! Status and log endpoints.

use super::{ClientError, CrconClient, parse_response};
use crate::objects::{
    HistoricalLogEntry, LogPage, RecentLogEntry, RecentLogs, RecentLogsQuery, ServerStatus,
};

impl CrconClient {
    /// `GET /api/get_status` – used as the connection handshake.
    pub async fn get_status(&self) -> Result<ServerStatus, ClientError> {
        let url = self.endpoint("api/get_status")?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /api/get_historical_logs?limit=N` – newest `limit` rows, any order.
    pub async fn get_historical_logs(
        &self,
        limit: u32,
    ) -> Result<LogPage<HistoricalLogEntry>, ClientError> {
        let url = self.endpoint("api/get_historical_logs")?;
        let resp = self
            .http
            .get(url)
            .query(&[("limit", limit)])
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let values: Vec<serde_json::Value> = parse_response(resp).await?;
        Ok(LogPage::decode(values))
    }

    /// `POST /api/get_recent_logs` – structured lines filtered server-side.
    pub async fn get_recent_logs(
        &self,
        query: &RecentLogsQuery,
    ) -> Result<LogPage<RecentLogEntry>, ClientError> {
        let url = self.endpoint("api/get_recent_logs")?;
        let resp = self
            .http
            .post(url)
            .json(query)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let result: RecentLogs = parse_response(resp).await?;
        Ok(LogPage::decode(result.logs))
    }
}
