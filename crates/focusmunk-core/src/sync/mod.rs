//! Policy synchronization with the configuration server.
//!
//! The server is the system of record. The sync client pulls the whole
//! policy, replaces the local cache wholesale and persists it; it never
//! merges and never decides verdicts.

mod bootstrap;
mod client;

pub use bootstrap::BootstrapSignal;
pub use client::{SyncClient, SyncOutcome};
