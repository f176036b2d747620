//! `focusmunk daemon`: the background service behind a JSON-lines bridge.
//!
//! Each stdin line is one [`Request`]; an optional `"id"` member is echoed on
//! the matching response so callers can correlate replies, which may arrive
//! out of order. Redirects are written as [`HostCommand`] lines without an id.
//! Logs go to stderr.

use std::sync::Arc;

use focusmunk_core::{BackgroundService, BridgeHost, Config, Request, Response, StateStore};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::{runtime, CliResult};

pub fn run() -> CliResult {
    let config = Config::load()?;
    config.validate()?;
    let store = StateStore::open()?;
    runtime()?.block_on(serve(config, store))
}

async fn serve(config: Config, store: StateStore) -> CliResult {
    let (host, mut commands) = BridgeHost::new();
    let service = Arc::new(BackgroundService::from_config(&config, store, Arc::new(host))?);
    tracing::info!(server = %config.server.url, "daemon starting");
    let timers = service.start(config.sync_interval(), config.sweep_interval());

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            let written = async {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await
            };
            if let Err(err) = written.await {
                tracing::error!(error = %err, "stdout closed");
                break;
            }
        }
    });

    let forwarder = tokio::spawn({
        let out = out_tx.clone();
        async move {
            while let Some(command) = commands.recv().await {
                match serde_json::to_string(&command) {
                    Ok(line) => {
                        let _ = out.send(line);
                    }
                    Err(err) => tracing::error!(error = %err, "could not encode host command"),
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let service = Arc::clone(&service);
        let out = out_tx.clone();
        tokio::spawn(async move {
            let _ = out.send(handle_line(&service, &line).await);
        });
    }

    tracing::info!("stdin closed, shutting down");
    for timer in timers {
        timer.abort();
    }
    forwarder.abort();
    drop(out_tx);
    let _ = writer.await;
    Ok(())
}

/// Decode one request line, dispatch it, and encode the reply.
async fn handle_line(service: &BackgroundService, line: &str) -> String {
    let (id, response) = match serde_json::from_str::<Value>(line) {
        Ok(mut value) => {
            let id = value.as_object_mut().and_then(|obj| obj.remove("id"));
            match serde_json::from_value::<Request>(value) {
                Ok(request) => (id, service.handle(request).await),
                Err(err) => (id, invalid(err)),
            }
        }
        Err(err) => (None, invalid(err)),
    };
    encode(id, &response)
}

fn invalid(err: serde_json::Error) -> Response {
    tracing::debug!(error = %err, "rejecting malformed request");
    Response::Error {
        message: format!("invalid request: {err}"),
    }
}

fn encode(id: Option<Value>, response: &Response) -> String {
    let mut value = match serde_json::to_value(response) {
        Ok(value) => value,
        Err(err) => serde_json::json!({ "type": "error", "message": err.to_string() }),
    };
    if let (Some(id), Some(obj)) = (id, value.as_object_mut()) {
        obj.insert("id".into(), id);
    }
    value.to_string()
}
