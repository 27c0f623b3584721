//! Event channel factories and handles.

use super::types::SinkEvent;
use crate::entities::ChatEvent;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for ChatEvent events.
pub type ChatEventSender = mpsc::Sender<ChatEvent>;
/// Receiver handle for ChatEvent events.
pub type ChatEventReceiver = mpsc::Receiver<ChatEvent>;

/// Sender handle for SinkEvent events.
pub type SinkEventSender = mpsc::Sender<SinkEvent>;
/// Receiver handle for SinkEvent events.
pub type SinkEventReceiver = mpsc::Receiver<SinkEvent>;

/// Create a new ChatEvent channel.
///
/// Returns a (sender, receiver) pair for ChatEvent events.
pub fn chat_event_channel() -> (ChatEventSender, ChatEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a new SinkEvent channel.
///
/// Multiple senders can be cloned from the returned sender, one per gateway
/// handler invocation.
pub fn sink_event_channel() -> (SinkEventSender, SinkEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
