use std::collections::HashMap;

use thiserror::Error;
use time::OffsetDateTime;

use crate::entities::{ThreadRef, Ticket, TicketState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("player {0} already has an open ticket")]
    AlreadyOpen(String),

    #[error("thread {0} already backs another ticket")]
    ThreadInUse(ThreadRef),

    #[error("thread {0} does not belong to an open ticket")]
    UnknownThread(ThreadRef),
}

/// Open tickets, at most one per player.
///
/// Tickets only change through the transition methods below. Closing a
/// ticket removes it, which frees the player to open a new one.
#[derive(Debug, Default)]
pub struct TicketRegistry {
    tickets: HashMap<String, Ticket>,
    by_thread: HashMap<ThreadRef, String>,
}

impl TicketRegistry {
    pub fn active(&self, player: &str) -> Option<&Ticket> {
        self.tickets.get(player)
    }

    pub fn by_thread(&self, thread: ThreadRef) -> Option<&Ticket> {
        self.by_thread
            .get(&thread)
            .and_then(|player| self.tickets.get(player))
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// `(player, thread)` of every open ticket, sorted by thread.
    pub fn threads(&self) -> Vec<(String, ThreadRef)> {
        let mut threads: Vec<_> = self
            .tickets
            .values()
            .map(|t| (t.player_name.clone(), t.thread))
            .collect();
        threads.sort_by_key(|(_, thread)| *thread);
        threads
    }

    /// absent -> New
    pub fn open(
        &mut self,
        player: &str,
        thread: ThreadRef,
        now: OffsetDateTime,
    ) -> Result<&Ticket, RegistryError> {
        if self.tickets.contains_key(player) {
            return Err(RegistryError::AlreadyOpen(player.to_string()));
        }
        if self.by_thread.contains_key(&thread) {
            return Err(RegistryError::ThreadInUse(thread));
        }
        self.by_thread.insert(thread, player.to_string());
        let ticket = self.tickets.entry(player.to_string()).or_insert(Ticket {
            player_name: player.to_string(),
            state: TicketState::New,
            thread,
            claimed_by: None,
            created_at: now,
            last_activity_at: now,
            thread_missing: false,
        });
        Ok(ticket)
    }

    /// Player wrote into the ticket. State is kept.
    pub fn record_activity(&mut self, player: &str, now: OffsetDateTime) -> Option<&Ticket> {
        let ticket = self.tickets.get_mut(player)?;
        ticket.last_activity_at = now;
        Some(ticket)
    }

    /// any -> Claimed. A second claim hands the ticket to the new actor.
    pub fn claim(
        &mut self,
        thread: ThreadRef,
        actor: &str,
        now: OffsetDateTime,
    ) -> Result<&Ticket, RegistryError> {
        let ticket = self.ticket_for_thread_mut(thread)?;
        ticket.state = TicketState::Claimed;
        ticket.claimed_by = Some(actor.to_string());
        ticket.last_activity_at = now;
        Ok(ticket)
    }

    /// any -> Closed. The ticket leaves the registry and is returned.
    pub fn close(&mut self, thread: ThreadRef) -> Result<Ticket, RegistryError> {
        let player = self
            .by_thread
            .remove(&thread)
            .ok_or(RegistryError::UnknownThread(thread))?;
        let mut ticket = self
            .tickets
            .remove(&player)
            .ok_or(RegistryError::UnknownThread(thread))?;
        ticket.state = TicketState::Closed;
        Ok(ticket)
    }

    /// Flag the ticket so the player's next message recreates it.
    pub fn mark_thread_missing(&mut self, thread: ThreadRef) -> Option<&Ticket> {
        let ticket = self.ticket_for_thread_mut(thread).ok()?;
        ticket.thread_missing = true;
        Some(ticket)
    }

    /// Drop a ticket whose thread is gone, without the close side effects.
    pub fn evict(&mut self, player: &str) -> Option<Ticket> {
        let ticket = self.tickets.remove(player)?;
        self.by_thread.remove(&ticket.thread);
        Some(ticket)
    }

    fn ticket_for_thread_mut(&mut self, thread: ThreadRef) -> Result<&mut Ticket, RegistryError> {
        let player = self
            .by_thread
            .get(&thread)
            .ok_or(RegistryError::UnknownThread(thread))?;
        self.tickets
            .get_mut(player)
            .ok_or(RegistryError::UnknownThread(thread))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    #[test]
    fn one_open_ticket_per_player() {
        let mut registry = TicketRegistry::default();
        registry.open("Bob", ThreadRef(1), now()).unwrap();
        assert_eq!(
            registry.open("Bob", ThreadRef(2), now()).unwrap_err(),
            RegistryError::AlreadyOpen("Bob".to_string())
        );
        assert_eq!(
            registry.open("Ann", ThreadRef(1), now()).unwrap_err(),
            RegistryError::ThreadInUse(ThreadRef(1))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn claim_then_reclaim() {
        let mut registry = TicketRegistry::default();
        registry.open("Bob", ThreadRef(1), now()).unwrap();

        let ticket = registry.claim(ThreadRef(1), "Mod A", now()).unwrap();
        assert_eq!(ticket.state, TicketState::Claimed);

        let ticket = registry.claim(ThreadRef(1), "Mod B", now()).unwrap();
        assert_eq!(ticket.claimed_by.as_deref(), Some("Mod B"));

        assert_eq!(
            registry.claim(ThreadRef(9), "Mod A", now()).unwrap_err(),
            RegistryError::UnknownThread(ThreadRef(9))
        );
    }

    #[test]
    fn close_frees_player_and_thread() {
        let mut registry = TicketRegistry::default();
        registry.open("Bob", ThreadRef(1), now()).unwrap();
        let closed = registry.close(ThreadRef(1)).unwrap();
        assert_eq!(closed.state, TicketState::Closed);
        assert!(registry.active("Bob").is_none());
        assert!(registry.by_thread(ThreadRef(1)).is_none());
        assert!(registry.close(ThreadRef(1)).is_err());
        registry.open("Bob", ThreadRef(2), now()).unwrap();
    }

    #[test]
    fn missing_thread_flag_and_eviction() {
        let mut registry = TicketRegistry::default();
        registry.open("Bob", ThreadRef(1), now()).unwrap();
        assert!(registry.mark_thread_missing(ThreadRef(1)).unwrap().thread_missing);
        assert!(registry.mark_thread_missing(ThreadRef(2)).is_none());

        let evicted = registry.evict("Bob").unwrap();
        assert_eq!(evicted.thread, ThreadRef(1));
        assert!(registry.is_empty());
        assert!(registry.by_thread(ThreadRef(1)).is_none());
    }

    #[test]
    fn activity_keeps_state() {
        let mut registry = TicketRegistry::default();
        registry.open("Bob", ThreadRef(1), now()).unwrap();
        registry.claim(ThreadRef(1), "Mod", now()).unwrap();
        let ticket = registry.record_activity("Bob", now()).unwrap();
        assert_eq!(ticket.state, TicketState::Claimed);
        assert!(registry.record_activity("Ann", now()).is_none());
    }
}
