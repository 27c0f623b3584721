//! Game log payloads.
//!
//! CRCON exposes the same chat lines in two shapes: the persisted
//! historical log (numeric ids) and the structured recent log (millisecond
//! timestamps). Both are modelled here with lenient optional fields since
//! non-chat actions leave most of them empty.

use serde::{Deserialize, Serialize};

/// Action category used for chat lines in both log shapes.
pub const CHAT_ACTION: &str = "CHAT";

/// `GET /api/get_status` result. Only the server name is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub name: String,
}

/// One row of `GET /api/get_historical_logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalLogEntry {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub log_type: String,
    #[serde(default)]
    pub player1_name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub event_time: serde_json::Value,
}

impl HistoricalLogEntry {
    /// Whether this row is a chat line (`CHAT[Allies]`, `CHAT[Axis][Unit]`, ...).
    pub fn is_chat(&self) -> bool {
        self.log_type.contains(CHAT_ACTION)
    }

    /// Chat text, falling back to the raw line when `content` is empty.
    pub fn text(&self) -> Option<&str> {
        non_empty(self.content.as_deref()).or_else(|| non_empty(self.raw.as_deref()))
    }
}

/// Body of `POST /api/get_recent_logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentLogsQuery {
    /// Maximum number of lines to return.
    pub end: u32,
    pub filter_action: Vec<String>,
    pub inclusive_filter: bool,
    /// Lower bound in unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_timestamp: Option<i64>,
}

impl RecentLogsQuery {
    /// Chat lines only, newest `end` lines, optionally bounded below.
    pub fn chat(end: u32, min_timestamp: Option<i64>) -> Self {
        Self {
            end,
            filter_action: vec![CHAT_ACTION.to_string()],
            inclusive_filter: true,
            min_timestamp,
        }
    }
}

/// `POST /api/get_recent_logs` result.
///
/// The lines are kept raw so that a single bad row does not poison the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentLogs {
    #[serde(default)]
    pub logs: Vec<serde_json::Value>,
}

/// A structured log line as produced by the recent-log endpoint and the log
/// stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentLogEntry {
    pub timestamp_ms: i64,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub player_name_1: Option<String>,
    #[serde(default)]
    pub player_id_1: Option<String>,
    #[serde(default)]
    pub sub_content: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub event_time: serde_json::Value,
}

impl RecentLogEntry {
    pub fn is_chat(&self) -> bool {
        self.action.contains(CHAT_ACTION)
    }

    /// Chat text. `sub_content` holds the bare message, `message` the
    /// formatted line.
    pub fn text(&self) -> Option<&str> {
        non_empty(self.sub_content.as_deref()).or_else(|| non_empty(self.message.as_deref()))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn historical_entry_falls_back_to_raw() {
        let entry: HistoricalLogEntry = serde_json::from_str(
            r#"{"id": 4512, "type": "CHAT[Axis][Team]", "player1_name": "Kurt",
                "content": "", "raw": "CHAT[Axis][Team]: Kurt: !admin griefer", "event_time": "2024-05-01T10:00:00"}"#,
        )
        .unwrap();
        assert!(entry.is_chat());
        assert_eq!(entry.text(), Some("CHAT[Axis][Team]: Kurt: !admin griefer"));
    }

    #[test]
    fn recent_entry_prefers_sub_content() {
        let entry: RecentLogEntry = serde_json::from_str(
            r#"{"timestamp_ms": 1714557600123, "action": "CHAT[Allies]", "player_name_1": "Bob",
                "player_id_1": "76561198000000000", "sub_content": "admin help",
                "message": "Bob: admin help (76561198000000000)", "version": 1}"#,
        )
        .unwrap();
        assert_eq!(entry.text(), Some("admin help"));
        assert!(entry.is_chat());
    }

    #[test]
    fn chat_query_omits_missing_lower_bound() {
        let body = serde_json::to_value(RecentLogsQuery::chat(50, None)).unwrap();
        assert!(body.get("min_timestamp").is_none());
        assert_eq!(body["filter_action"][0], "CHAT");
    }
}
