//! Runtime configuration consumed by the core.
//!
//! These are already-validated values. The binary maps its TOML file onto
//! them; the ticket policy can be swapped at runtime through a
//! [`PolicyWatch`].

mod ingest;
mod policy;

pub use ingest::{BackoffConfig, IngestConfig, TransportKind};
pub use policy::{PlayerNotices, TicketPolicy, Trigger, TriggerMode};

use std::sync::Arc;
use tokio::sync::watch;

/// Sender half used to publish a new [`TicketPolicy`].
pub type PolicyPublisher = watch::Sender<Arc<TicketPolicy>>;
/// Receiver half held by the ticket desk.
pub type PolicyWatch = watch::Receiver<Arc<TicketPolicy>>;

/// Create a policy channel seeded with `initial`.
pub fn policy_channel(initial: TicketPolicy) -> (PolicyPublisher, PolicyWatch) {
    watch::channel(Arc::new(initial))
}
