//! Polling `get_historical_logs`, cursor on the numeric log id.
//!
//! The endpoint only takes a row limit, so every poll returns the newest
//! page and rows at or below the cursor are filtered out here.

use modmail_sdk::objects::HistoricalLogEntry;
use tracing::{debug, info, warn};

use super::{Cursor, DedupeWindow, IngestError, LogApi};
use crate::entities::{ChatEvent, DedupeKey, EventTime};

#[derive(Debug, Clone)]
pub struct HistoricalPolling {
    page_size: u32,
    seed_size: u32,
    cursor: Option<i64>,
}

impl HistoricalPolling {
    pub fn new(page_size: u32, seed_size: u32) -> Self {
        Self {
            page_size,
            seed_size,
            cursor: None,
        }
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor.map(Cursor::LogId)
    }

    /// Place the cursor on the newest existing row so history is not replayed.
    pub async fn seed(
        &mut self,
        api: &dyn LogApi,
        dedupe: &mut DedupeWindow,
    ) -> Result<(), IngestError> {
        let page = api.historical_logs(self.seed_size).await?;
        for entry in &page.entries {
            dedupe.insert(DedupeKey::LogId(entry.id));
            self.advance(entry.id);
        }
        info!(cursor = ?self.cursor, rows = page.entries.len(), "Seeded historical log cursor");
        Ok(())
    }

    pub async fn poll(
        &mut self,
        api: &dyn LogApi,
        dedupe: &mut DedupeWindow,
    ) -> Result<Vec<ChatEvent>, IngestError> {
        let page = api.historical_logs(self.page_size).await?;
        if page.rejected > 0 {
            warn!(rejected = page.rejected, "Dropped malformed historical log rows");
        }
        Ok(self.accept(page.entries, dedupe))
    }

    /// Filter a page down to unseen chat lines, in id order, advancing the
    /// cursor past every unseen row.
    pub fn accept(
        &mut self,
        mut entries: Vec<HistoricalLogEntry>,
        dedupe: &mut DedupeWindow,
    ) -> Vec<ChatEvent> {
        entries.sort_by_key(|e| e.id);
        let floor = self.cursor;
        let mut events = Vec::new();

        for entry in entries {
            if floor.is_some_and(|c| entry.id <= c) {
                continue;
            }
            if !dedupe.insert(DedupeKey::LogId(entry.id)) {
                continue;
            }
            self.advance(entry.id);

            if !entry.is_chat() {
                continue;
            }
            let text = entry.text().map(str::to_owned);
            let player = entry.player1_name.filter(|p| !p.trim().is_empty());
            let (Some(player), Some(text)) = (player, text) else {
                debug!(id = entry.id, "Skipping chat row without player or text");
                continue;
            };
            events.push(ChatEvent::new(
                player,
                text,
                EventTime::from(entry.event_time),
                DedupeKey::LogId(entry.id),
            ));
        }
        events
    }

    fn advance(&mut self, id: i64) {
        self.cursor = Some(self.cursor.map_or(id, |c| c.max(id)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, kind: &str, player: &str, content: &str) -> HistoricalLogEntry {
        HistoricalLogEntry {
            id,
            log_type: kind.to_string(),
            player1_name: Some(player.to_string()),
            content: Some(content.to_string()),
            raw: None,
            event_time: serde_json::json!("2024-05-01T10:00:00"),
        }
    }

    #[test]
    fn accepts_only_new_chat_rows_in_order() {
        let mut poller = HistoricalPolling::new(50, 10);
        let mut dedupe = DedupeWindow::new(100);
        let events = poller.accept(
            vec![
                row(12, "CHAT[Axis]", "Kurt", "second"),
                row(11, "KILL", "Kurt", ""),
                row(10, "CHAT[Allies]", "Bob", "first"),
            ],
            &mut dedupe,
        );
        let texts: Vec<_> = events.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
        assert_eq!(poller.cursor(), Some(Cursor::LogId(12)));
    }

    #[test]
    fn same_page_twice_is_processed_once() {
        let mut poller = HistoricalPolling::new(50, 10);
        let mut dedupe = DedupeWindow::new(100);
        let page = vec![row(20, "CHAT[Allies]", "Bob", "admin help")];
        assert_eq!(poller.accept(page.clone(), &mut dedupe).len(), 1);
        assert!(poller.accept(page, &mut dedupe).is_empty());
    }

    #[test]
    fn cursor_never_regresses_on_stale_page() {
        let mut poller = HistoricalPolling::new(50, 10);
        let mut dedupe = DedupeWindow::new(100);
        poller.accept(vec![row(30, "CHAT", "Bob", "hi")], &mut dedupe);
        let events = poller.accept(vec![row(25, "CHAT", "Ann", "late")], &mut dedupe);
        assert!(events.is_empty());
        assert_eq!(poller.cursor(), Some(Cursor::LogId(30)));
    }

    #[test]
    fn rows_without_player_are_dropped() {
        let mut poller = HistoricalPolling::new(50, 10);
        let mut dedupe = DedupeWindow::new(100);
        let mut orphan = row(5, "CHAT", "", "admin");
        orphan.player1_name = None;
        assert!(poller.accept(vec![orphan], &mut dedupe).is_empty());
        assert_eq!(poller.cursor(), Some(Cursor::LogId(5)));
    }
}
