//! Following the `/ws/logs` push stream, cursor on the stream entry id.

use modmail_sdk::client::LogStream;
use modmail_sdk::objects::{LogStreamBatch, LogStreamSubscribe, RecentLogsQuery, StreamId};
use tracing::{debug, info, warn};

use super::recent::to_chat_event;
use super::{Cursor, DedupeWindow, IngestError, LogApi};
use crate::entities::{ChatEvent, DedupeKey};

#[derive(Debug, Clone)]
pub struct StreamFollowing {
    seed_size: u32,
    last_seen: Option<StreamId>,
    /// Lines at or before this unix millisecond predate startup.
    not_before: Option<i64>,
}

impl StreamFollowing {
    pub fn new(seed_size: u32) -> Self {
        Self {
            seed_size,
            last_seen: None,
            not_before: None,
        }
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.last_seen.map(Cursor::Stream)
    }

    /// Place the startup watermark on the newest chat line in recent
    /// history, or on the local clock if history is unavailable.
    pub async fn seed(&mut self, api: &dyn LogApi) {
        let newest = match api
            .recent_logs(&RecentLogsQuery::chat(self.seed_size, None))
            .await
        {
            Ok(page) => page.entries.iter().map(|e| e.timestamp_ms).max(),
            Err(e) => {
                warn!(error = %e, "Could not read recent history, starting stream from now");
                None
            }
        };
        let watermark = newest.unwrap_or_else(now_millis);
        self.not_before = Some(watermark);
        info!(not_before = watermark, "Seeded log stream watermark");
    }

    /// Connect and subscribe, resuming after the last processed entry.
    pub async fn open(&self, api: &dyn LogApi) -> Result<LogStream, IngestError> {
        let subscribe = LogStreamSubscribe::chat(self.last_seen.as_ref());
        let stream = api
            .open_log_stream(&subscribe)
            .await
            .map_err(IngestError::Connection)?;
        info!(last_seen = ?subscribe.last_seen_id, "Subscribed to log stream");
        Ok(stream)
    }

    pub async fn receive(
        &mut self,
        stream: &mut LogStream,
        dedupe: &mut DedupeWindow,
    ) -> Result<Vec<ChatEvent>, IngestError> {
        let batch = stream.next_batch().await?;
        Ok(self.accept(batch, dedupe))
    }

    pub fn accept(&mut self, batch: LogStreamBatch, dedupe: &mut DedupeWindow) -> Vec<ChatEvent> {
        let batch_cursor = batch
            .last_seen_id
            .as_deref()
            .and_then(|id| id.parse::<StreamId>().ok());
        let page = batch.entries();
        if page.rejected > 0 {
            warn!(rejected = page.rejected, "Dropped malformed stream entries");
        }

        let mut entries: Vec<_> = page
            .entries
            .into_iter()
            .filter_map(|entry| match entry.id.parse::<StreamId>() {
                Ok(id) => Some((id, entry)),
                Err(e) => {
                    warn!(error = %e, "Dropped stream entry with invalid id");
                    None
                }
            })
            .collect();
        entries.sort_by_key(|(id, _)| *id);

        let floor = self.last_seen;
        let mut events = Vec::new();
        for (id, entry) in entries {
            if floor.is_some_and(|c| id <= c) {
                continue;
            }
            let key = DedupeKey::Text(entry.id);
            if !dedupe.insert(key.clone()) {
                continue;
            }
            self.advance(id);

            if self.not_before.is_some_and(|nb| entry.log.timestamp_ms <= nb) {
                debug!(%id, "Skipping stream entry from before startup");
                continue;
            }
            if !entry.log.is_chat() {
                continue;
            }
            if let Some(event) = to_chat_event(entry.log, key) {
                events.push(event);
            }
        }

        if let Some(id) = batch_cursor {
            self.advance(id);
        }
        events
    }

    fn advance(&mut self, id: StreamId) {
        self.last_seen = Some(self.last_seen.map_or(id, |c| c.max(id)));
    }
}

fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
