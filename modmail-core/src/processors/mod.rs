//! Long-running tasks of the pipeline.
//!
//! - `IngestRunner`: drives the event source adapter, emits `ChatEvent`
//! - `TicketDesk`: receives `ChatEvent` and `SinkEvent`, owns the ticket
//!   registry and drives the sink and messenger

pub mod ingest_runner;
pub mod ticket_desk;

pub use ingest_runner::IngestRunner;
pub use ticket_desk::TicketDesk;
