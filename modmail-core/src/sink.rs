//! Notification sink interface.
//!
//! The sink owns the human-facing side of a ticket (a Discord forum thread
//! in production). The desk drives it with the commands below; the sink
//! reports admin actions back as [`SinkEvent`](crate::events::SinkEvent)s.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::entities::{EventTime, ThreadRef};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The thread was deleted out from under the ticket.
    #[error("thread {0} no longer exists")]
    ThreadMissing(ThreadRef),

    /// Any other refusal or transport failure.
    #[error("sink rejected the command: {0}")]
    Rejected(String),
}

/// Ticket status shown on the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTag {
    /// Waiting on an admin.
    New,
    /// An admin claimed or answered.
    Replied,
    Closed,
}

impl StatusTag {
    pub const ALL: [StatusTag; 3] = [StatusTag::New, StatusTag::Replied, StatusTag::Closed];

    pub fn name(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Replied => "REPLIED",
            Self::Closed => "CLOSED",
        }
    }
}

/// Everything needed to open a ticket thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadDraft {
    pub title: String,
    pub player_name: String,
    pub message: String,
    pub occurred_at: EventTime,
}

impl ThreadDraft {
    pub fn new(player_name: &str, message: &str, occurred_at: EventTime, now: OffsetDateTime) -> Self {
        Self {
            title: thread_title(player_name, now),
            player_name: player_name.to_string(),
            message: message.to_string(),
            occurred_at,
        }
    }
}

/// `"2024-05-01 10:00 - Bob"`
pub fn thread_title(player_name: &str, at: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02} - {}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        player_name
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    /// Ordinary chat line from the ticket owner.
    PlayerMessage,
    /// The owner typed the trigger again.
    RepeatedRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadPost {
    pub kind: PostKind,
    pub player_name: String,
    pub text: String,
    pub occurred_at: EventTime,
}

/// Which actions the thread offers to admins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Controls {
    Awaiting { player: String },
    Claimed { player: String, by: String },
    Closed { player: String, by: String },
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Open a thread with the request and the initial controls.
    async fn create_ticket_thread(&self, draft: &ThreadDraft) -> Result<ThreadRef, SinkError>;

    async fn post_to_thread(&self, thread: ThreadRef, post: &ThreadPost) -> Result<(), SinkError>;

    /// Replace the status tag, leaving unrelated tags alone.
    async fn set_status_tag(&self, thread: ThreadRef, tag: StatusTag) -> Result<(), SinkError>;

    /// Post fresh controls at the bottom of the thread, retiring older ones.
    async fn show_controls(&self, thread: ThreadRef, controls: &Controls) -> Result<(), SinkError>;

    async fn archive_and_lock(&self, thread: ThreadRef) -> Result<(), SinkError>;

    async fn thread_exists(&self, thread: ThreadRef) -> Result<bool, SinkError>;
}
