//! Wire types and clients for the community RCON (CRCON) web API.
//!
//! The [`objects`] module is always available. The HTTP and WebSocket
//! clients live in [`client`] behind the `client` feature.

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
