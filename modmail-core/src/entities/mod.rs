//! Plain data carried between the adapter, the desk and the sink.

mod chat_event;
mod ticket;

pub use chat_event::{ChatEvent, DedupeKey, EventTime};
pub use ticket::{ThreadRef, Ticket, TicketState};
