//! HTTP client for the configuration server.
//!
//! The server is the system of record for every policy field. This module
//! only speaks its JSON contract; deciding what a failure means is left to
//! the sync client and the navigation gate.

mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{CreateConfigRequest, FreeTimeResponse, PolicyUpdate};
