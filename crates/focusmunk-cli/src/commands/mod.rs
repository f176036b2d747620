pub mod check;
pub mod config;
pub mod daemon;
pub mod pairing;
pub mod session;
pub mod settings;
pub mod status;

use std::sync::Arc;

use focusmunk_core::{ApiClient, Config, CoreError, SharedCache, StateStore, SyncClient};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Sync client over the persisted cache, pointed at the configured server.
pub(crate) fn open_client(config: &Config) -> Result<SyncClient, CoreError> {
    let store = StateStore::open()?;
    let cache = SharedCache::new(store.load()?);
    let api = ApiClient::new(&config.server.url, config.request_timeout())?;
    Ok(SyncClient::new(api, cache, Arc::new(store)))
}

pub(crate) fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Comma-separated list argument, trimmed, blanks dropped.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(
            split_list(" example.com, ,wikipedia.org,"),
            vec!["example.com", "wikipedia.org"]
        );
        assert!(split_list("").is_empty());
    }
}
