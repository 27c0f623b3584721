#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod classifier;
pub mod config;
pub mod entities;
pub mod events;
pub mod ingest;
pub mod messenger;
pub mod processors;
pub mod sink;
pub mod tickets;
pub mod utils;
