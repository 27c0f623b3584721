//! Authoritative ticket state, keyed by player display name.

mod registry;

pub use registry::{RegistryError, TicketRegistry};
