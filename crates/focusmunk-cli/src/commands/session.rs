//! Free-time sessions and temporary disable.

use clap::Subcommand;
use focusmunk_core::budget::format_seconds;
use focusmunk_core::Config;

use super::{open_client, runtime, CliResult};

#[derive(Subcommand)]
pub enum FreeTimeAction {
    /// Open a free-time session
    Start,
    /// Close the current session
    End,
}

pub fn free_time(action: FreeTimeAction) -> CliResult {
    let config = Config::load()?;
    let client = open_client(&config)?;
    let rt = runtime()?;
    match action {
        FreeTimeAction::Start => {
            let resp = rt.block_on(client.start_free_time())?;
            println!(
                "free time started, {} left today",
                format_seconds(resp.free_time_remaining)
            );
        }
        FreeTimeAction::End => {
            let resp = rt.block_on(client.end_free_time())?;
            println!(
                "free time ended, {} left today",
                format_seconds(resp.free_time_remaining)
            );
        }
    }
    Ok(())
}

pub fn disable(hours: f64, password: &str) -> CliResult {
    if !(hours.is_finite() && hours > 0.0) {
        return Err("hours must be a positive number".into());
    }
    let config = Config::load()?;
    let client = open_client(&config)?;
    let until = runtime()?.block_on(client.temporary_disable(password, hours))?;
    println!("blocking disabled until {}", until.format("%Y-%m-%d %H:%M UTC"));
    Ok(())
}

pub fn enable() -> CliResult {
    let config = Config::load()?;
    let client = open_client(&config)?;
    runtime()?.block_on(client.cancel_disable())?;
    println!("blocking re-enabled");
    Ok(())
}

pub fn verify(password: &str) -> CliResult {
    let config = Config::load()?;
    let client = open_client(&config)?;
    if runtime()?.block_on(client.verify_password(password))? {
        println!("password ok");
        Ok(())
    } else {
        Err("wrong password".into())
    }
}
