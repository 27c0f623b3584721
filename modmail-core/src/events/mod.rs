//! Event system for the ticket pipeline.
//!
//! # Event Flow
//!
//! 1. `IngestRunner` emits `ChatEvent` -> `TicketDesk`
//! 2. The notification sink (Discord) emits `SinkEvent` -> `TicketDesk`
//! 3. `TicketDesk` drives the `NotificationSink` and `OutboundMessenger`
//!
//! The desk is the only consumer of both channels, so every ticket
//! mutation happens on one task in arrival order.

pub mod channels;
pub mod types;

pub use channels::{
    ChatEventReceiver, ChatEventSender, DEFAULT_CHANNEL_BUFFER, SinkEventReceiver,
    SinkEventSender, chat_event_channel, sink_event_channel,
};

pub use types::{ActionOutcome, Ack, ReplyOutcome, SinkEvent};
