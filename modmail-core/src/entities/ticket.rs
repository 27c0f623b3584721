use std::fmt;
use time::OffsetDateTime;

/// Opaque handle of the thread a sink created for a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadRef(pub u64);

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    New,
    Claimed,
    Closed,
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Claimed => "claimed",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A support interaction with one player, backed by one sink thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub player_name: String,
    pub state: TicketState,
    pub thread: ThreadRef,
    pub claimed_by: Option<String>,
    pub created_at: OffsetDateTime,
    pub last_activity_at: OffsetDateTime,
    /// Set once the sink reported the thread deleted; the next player
    /// message recreates the ticket.
    pub thread_missing: bool,
}

