use chrono::Utc;
use focusmunk_core::budget::{format_seconds, FreeTimeStatus};
use focusmunk_core::{Config, StateReport, StateStore, SyncOutcome};

use super::{open_client, runtime, CliResult};

pub fn run(json: bool) -> CliResult {
    let cache = StateStore::open()?.load()?;
    let report = StateReport::from_cache(&cache, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for line in render(&report) {
        println!("{line}");
    }
    Ok(())
}

/// Refresh now and report what happened.
pub fn sync() -> CliResult {
    let config = Config::load()?;
    let client = open_client(&config)?;
    match runtime()?.block_on(client.refresh()) {
        SyncOutcome::Updated => println!("policy updated"),
        SyncOutcome::Unpaired => return Err("not paired; run `focusmunk pair <id>`".into()),
        SyncOutcome::Deleted => {
            println!("configuration was deleted on the server; this client is now unpaired")
        }
        SyncOutcome::Stale { reason } => {
            return Err(format!("sync failed, keeping last known policy: {reason}").into())
        }
    }
    Ok(())
}

fn render(report: &StateReport) -> Vec<String> {
    let mut lines = Vec::new();
    match (&report.config_id, report.configured) {
        (None, _) => {
            lines.push("Not paired. Everything except browser pages is blocked.".into());
            if let Some(at) = report.deleted_at {
                lines.push(format!(
                    "The previous configuration was deleted on the server at {}.",
                    at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            return lines;
        }
        (Some(id), false) => {
            lines.push(format!("Paired with {id}, waiting for first sync. Browsing is blocked."))
        }
        (Some(id), true) => lines.push(format!("Paired with {id}")),
    }

    if let Some(snapshot) = &report.snapshot {
        lines.push(format!(
            "Enforcement: {}",
            if snapshot.enabled { "on" } else { "off" }
        ));
        lines.push(format!("Allowed sites: {}", snapshot.allow_list.len()));
    }

    if let Some(status) = report.free_time {
        lines.push(format!("Free time: {}", describe(status)));
    }

    match report.last_sync_at {
        Some(at) => lines.push(format!("Last sync: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))),
        None => lines.push("Last sync: never".into()),
    }
    if let Some(err) = &report.last_error {
        lines.push(format!("Last sync error: {err}"));
    }
    lines
}

fn describe(status: FreeTimeStatus) -> String {
    match status {
        FreeTimeStatus::TemporarilyDisabled { until } => {
            format!("blocking disabled until {}", until.format("%H:%M UTC"))
        }
        FreeTimeStatus::Active { remaining } => format!("active, {} left", format_seconds(remaining)),
        FreeTimeStatus::Exhausted => "session ran out".into(),
        FreeTimeStatus::NoAllowanceToday => "none scheduled today".into(),
        FreeTimeStatus::Available { remaining } => format!("{} available", format_seconds(remaining)),
        FreeTimeStatus::UsedUp => "used up for today".into(),
    }
}
