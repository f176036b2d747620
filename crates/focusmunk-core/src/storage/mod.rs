mod config;
mod state_store;

pub use config::{Config, GateConfig, ServerConfig, SyncConfig};
pub use state_store::StateStore;

use std::path::PathBuf;

/// Returns `~/.config/focusmunk[-dev]/` based on FOCUSMUNK_ENV.
///
/// Set FOCUSMUNK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSMUNK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusmunk-dev")
    } else {
        base_dir.join("focusmunk")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
