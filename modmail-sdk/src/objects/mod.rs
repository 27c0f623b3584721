//! Request and response payloads exchanged with the CRCON API.

pub mod logs;
pub mod players;
pub mod ws;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use logs::{HistoricalLogEntry, RecentLogEntry, RecentLogs, RecentLogsQuery, ServerStatus};
pub use players::{LiveGameStats, MessagePlayerRequest, PlayerStat};
pub use ws::{LogStreamBatch, LogStreamEntry, LogStreamSubscribe, StreamId};

/// Envelope wrapping every CRCON API response.
///
/// ```json
/// {"result": {...}, "command": "get_status", "failed": false, "error": null}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the envelope, turning `failed: true` or a missing result into
    /// the server supplied error message.
    pub fn into_result(self) -> Result<T, String> {
        if self.failed {
            return Err(self
                .error
                .unwrap_or_else(|| "request failed without an error message".to_string()));
        }
        self.result
            .ok_or_else(|| self.error.unwrap_or_else(|| "response has no result".to_string()))
    }
}

/// A page of log entries decoded one by one.
///
/// Entries that fail to decode are counted in `rejected` instead of failing
/// the whole page.
#[derive(Debug, Clone, PartialEq)]
pub struct LogPage<T> {
    pub entries: Vec<T>,
    pub rejected: usize,
}

impl<T> Default for LogPage<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            rejected: 0,
        }
    }
}

impl<T: DeserializeOwned> LogPage<T> {
    /// Decode each raw value independently.
    pub fn decode(values: Vec<serde_json::Value>) -> Self {
        let mut page = Self::default();
        for value in values {
            match serde_json::from_value(value) {
                Ok(entry) => page.entries.push(entry),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping undecodable log entry");
                    page.rejected += 1;
                }
            }
        }
        page
    }
}
