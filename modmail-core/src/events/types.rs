//! Event type definitions.

use crate::entities::ThreadRef;
use tokio::sync::oneshot;

/// Optional completion handle for an inbound sink event.
pub type Ack<T> = Option<oneshot::Sender<T>>;

/// Result of a claim or close, reported back to the acting admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    /// The thread does not belong to an active ticket.
    UnknownThread,
    /// The transition happened but a side effect failed.
    Partial(String),
}

/// Result of relaying an admin reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    Delivered,
    NotDelivered,
    UnknownThread,
}

/// Inbound events raised by the notification sink.
#[derive(Debug)]
pub enum SinkEvent {
    /// An admin pressed the claim control.
    Claim {
        thread: ThreadRef,
        actor: String,
        ack: Ack<ActionOutcome>,
    },
    /// An admin pressed the close control.
    Close {
        thread: ThreadRef,
        actor: String,
        ack: Ack<ActionOutcome>,
    },
    /// An admin wrote in a ticket thread.
    Reply {
        thread: ThreadRef,
        actor: String,
        text: String,
        ack: Ack<ReplyOutcome>,
    },
    /// The thread was deleted on the sink side.
    ThreadDeleted { thread: ThreadRef },
    /// Drop every ticket whose thread no longer exists. Acked with the
    /// number of tickets dropped.
    Sweep { ack: Ack<usize> },
}

/// Send `value` on an optional ack, ignoring a dropped receiver.
pub(crate) fn acknowledge<T>(ack: Ack<T>, value: T) {
    if let Some(tx) = ack {
        let _ = tx.send(value);
    }
}
