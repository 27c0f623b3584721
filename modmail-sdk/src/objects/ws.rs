//! WebSocket message types for the live log stream.
//!
//! The `/ws/logs` endpoint pushes batches of structured log lines.
//!
//! # Protocol
//!
//! 1. After the upgrade the client sends a [`LogStreamSubscribe`] frame
//!    naming the last entry it has seen (or `null`) and the action
//!    categories it wants.
//! 2. The server answers with [`LogStreamBatch`] frames, each carrying the
//!    id of its newest entry in `last_seen_id`.
//! 3. On reconnect the client resubscribes with the last id it processed so
//!    the server resumes after it.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::logs::{CHAT_ACTION, RecentLogEntry};
use super::LogPage;

/// Client-to-server subscription frame.
///
/// ```json
/// {"last_seen_id": "1714557600123-0", "actions": ["CHAT"]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogStreamSubscribe {
    pub last_seen_id: Option<String>,
    pub actions: Vec<String>,
}

impl LogStreamSubscribe {
    pub fn chat(last_seen_id: Option<&StreamId>) -> Self {
        Self {
            last_seen_id: last_seen_id.map(ToString::to_string),
            actions: vec![CHAT_ACTION.to_string()],
        }
    }
}

/// Server-to-client batch frame.
///
/// Entries are kept raw and decoded with [`LogStreamBatch::entries`] so a
/// single malformed line is dropped instead of the whole frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogStreamBatch {
    #[serde(default)]
    pub logs: Vec<serde_json::Value>,
    #[serde(default)]
    pub last_seen_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl LogStreamBatch {
    pub fn entries(self) -> LogPage<LogStreamEntry> {
        LogPage::decode(self.logs)
    }
}

/// One line of a [`LogStreamBatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogStreamEntry {
    pub id: String,
    pub log: RecentLogEntry,
}

/// Stream entry id in `"{millis}-{sequence}"` form.
///
/// Ordered numerically by `(millis, sequence)`, so `"99-5" < "100-0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId {
    pub millis: u64,
    pub seq: u64,
}

impl Ord for StreamId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.millis, self.seq).cmp(&(other.millis, other.seq))
    }
}

impl PartialOrd for StreamId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

impl FromStr for StreamId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (millis, seq) = match s.split_once('-') {
            Some((millis, seq)) => (millis, seq),
            None => (s, "0"),
        };
        let millis = millis
            .parse()
            .map_err(|_| format!("invalid stream id millis: {s}"))?;
        let seq = seq
            .parse()
            .map_err(|_| format!("invalid stream id sequence: {s}"))?;
        Ok(Self { millis, seq })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_ids_order_numerically() {
        let a: StreamId = "99-5".parse().unwrap();
        let b: StreamId = "100-0".parse().unwrap();
        let c: StreamId = "100-1".parse().unwrap();
        assert!(a < b);
        assert!(b < c);
        assert_eq!(c.to_string(), "100-1");
        assert!("abc-1".parse::<StreamId>().is_err());
    }

    #[test]
    fn bare_millis_parse_as_sequence_zero() {
        let id: StreamId = "1714557600123".parse().unwrap();
        assert_eq!(id, StreamId { millis: 1714557600123, seq: 0 });
    }

    #[test]
    fn batch_frame_decodes_entries_leniently() {
        let batch: LogStreamBatch = serde_json::from_str(
            r#"{"error": null, "last_seen_id": "1714557600200-0", "logs": [
                {"id": "1714557600100-0", "log": {"timestamp_ms": 1714557600100, "action": "CHAT[Allies]",
                    "player_name_1": "Bob", "sub_content": "admin pls"}},
                {"id": "1714557600200-0", "log": {"action": "CHAT"}}
            ]}"#,
        )
        .unwrap();
        let page = batch.entries();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.rejected, 1);
        assert_eq!(page.entries[0].log.player_name_1.as_deref(), Some("Bob"));
    }

    #[test]
    fn subscribe_frame_shape() {
        let id = StreamId { millis: 5, seq: 1 };
        let json = serde_json::to_string(&LogStreamSubscribe::chat(Some(&id))).unwrap();
        assert_eq!(json, r#"{"last_seen_id":"5-1","actions":["CHAT"]}"#);
    }
}
