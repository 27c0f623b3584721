//! Discord forum side of the ticket desk.

mod handler;
mod render;
mod sink;
mod tags;

pub use handler::TicketHandler;
pub use sink::{DiscordSink, SetupError};
