//! Polling `get_recent_logs`, cursor on the millisecond timestamp.
//!
//! Several lines can share a millisecond, so the lower bound sent to the
//! server is inclusive and repeats at the boundary are removed by the dedupe
//! window instead.

use modmail_sdk::objects::{RecentLogEntry, RecentLogsQuery};
use tracing::{debug, info, warn};

use super::{Cursor, DedupeWindow, IngestError, LogApi};
use crate::entities::{ChatEvent, DedupeKey, EventTime};

#[derive(Debug, Clone)]
pub struct RecentPolling {
    page_size: u32,
    seed_size: u32,
    cursor: Option<i64>,
}

impl RecentPolling {
    pub fn new(page_size: u32, seed_size: u32) -> Self {
        Self {
            page_size,
            seed_size,
            cursor: None,
        }
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor.map(Cursor::TimestampMs)
    }

    pub async fn seed(
        &mut self,
        api: &dyn LogApi,
        dedupe: &mut DedupeWindow,
    ) -> Result<(), IngestError> {
        let page = api
            .recent_logs(&RecentLogsQuery::chat(self.seed_size, None))
            .await?;
        for entry in &page.entries {
            if let Some(key) = dedupe_key(entry) {
                dedupe.insert(key);
            }
            self.advance(entry.timestamp_ms);
        }
        info!(cursor = ?self.cursor, rows = page.entries.len(), "Seeded recent log cursor");
        Ok(())
    }

    pub async fn poll(
        &mut self,
        api: &dyn LogApi,
        dedupe: &mut DedupeWindow,
    ) -> Result<Vec<ChatEvent>, IngestError> {
        let query = RecentLogsQuery::chat(self.page_size, self.cursor);
        let page = api.recent_logs(&query).await?;
        if page.rejected > 0 {
            warn!(rejected = page.rejected, "Dropped malformed recent log rows");
        }
        Ok(self.accept(page.entries, dedupe))
    }

    pub fn accept(
        &mut self,
        mut entries: Vec<RecentLogEntry>,
        dedupe: &mut DedupeWindow,
    ) -> Vec<ChatEvent> {
        entries.sort_by_key(|e| e.timestamp_ms);
        let floor = self.cursor;
        let mut events = Vec::new();

        for entry in entries {
            if floor.is_some_and(|c| entry.timestamp_ms < c) {
                continue;
            }
            let Some(key) = dedupe_key(&entry) else {
                debug!(timestamp_ms = entry.timestamp_ms, "Skipping line without player");
                self.advance(entry.timestamp_ms);
                continue;
            };
            if !dedupe.insert(key.clone()) {
                continue;
            }
            self.advance(entry.timestamp_ms);

            if !entry.is_chat() {
                continue;
            }
            if let Some(event) = to_chat_event(entry, key) {
                events.push(event);
            }
        }
        events
    }

    fn advance(&mut self, timestamp_ms: i64) {
        self.cursor = Some(self.cursor.map_or(timestamp_ms, |c| c.max(timestamp_ms)));
    }
}

/// `{timestamp}:{player}:{text}`, so one player can say two things in the
/// same millisecond.
fn dedupe_key(entry: &RecentLogEntry) -> Option<DedupeKey> {
    let player = entry.player_name_1.as_deref().filter(|p| !p.trim().is_empty())?;
    let text = entry.text().unwrap_or_default();
    Some(DedupeKey::Text(format!("{}:{player}:{text}", entry.timestamp_ms)))
}

/// Shared with the stream transport, which pushes the same line shape.
pub(super) fn to_chat_event(entry: RecentLogEntry, key: DedupeKey) -> Option<ChatEvent> {
    let text = entry.text()?.to_owned();
    let player = entry.player_name_1.filter(|p| !p.trim().is_empty())?;
    let occurred_at = match entry.event_time {
        serde_json::Value::Null => EventTime::Integer(entry.timestamp_ms),
        other => EventTime::from(other),
    };
    Some(ChatEvent::new(player, text, occurred_at, key))
}
