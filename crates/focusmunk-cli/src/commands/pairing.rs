//! Pairing: adopt, create or forget a server configuration.

use clap::Args;
use focusmunk_core::api::CreateConfigRequest;
use focusmunk_core::{Config, DailyBudget};

use super::{open_client, runtime, split_list, CliResult};

#[derive(Args)]
pub struct SetupArgs {
    /// Setup code issued by the server operator
    #[arg(long)]
    pub setup_code: String,
    /// Password protecting the settings (at least 4 characters)
    #[arg(long)]
    pub password: String,
    /// Allowed sites, comma-separated (plain text or regex)
    #[arg(long, default_value = "")]
    pub allow: String,
    /// Allowed video title keywords, comma-separated
    #[arg(long, default_value = "")]
    pub keywords: String,
    /// Allowed creators (channel URLs or @handles), comma-separated
    #[arg(long, default_value = "")]
    pub creators: String,
    /// Free-time minutes per day
    #[arg(long, default_value_t = 30)]
    pub daily_minutes: i64,
}

impl SetupArgs {
    fn to_request(&self) -> CreateConfigRequest {
        CreateConfigRequest {
            setup_code: self.setup_code.clone(),
            password: self.password.clone(),
            whitelist: split_list(&self.allow),
            youtube_keywords: split_list(&self.keywords),
            youtube_creators: split_list(&self.creators),
            daily_free_minutes: DailyBudget::uniform(self.daily_minutes),
        }
    }
}

pub fn pair(id: &str) -> CliResult {
    let config = Config::load()?;
    let client = open_client(&config)?;
    runtime()?.block_on(client.pair(id))?;
    println!("paired with {}", id.trim().to_uppercase());
    Ok(())
}

pub fn setup(args: SetupArgs) -> CliResult {
    if args.password.chars().count() < 4 {
        return Err("password must be at least 4 characters".into());
    }
    let config = Config::load()?;
    let client = open_client(&config)?;
    let rt = runtime()?;
    if !rt.block_on(client.api().health())? {
        return Err(format!("server at {} is not ready", config.server.url).into());
    }
    if !rt.block_on(client.api().verify_setup_code(&args.setup_code))? {
        return Err("setup code rejected".into());
    }
    let id = rt.block_on(client.create_and_pair(&args.to_request()))?;
    println!("created configuration {id}");
    println!("pair other browsers with: focusmunk pair {id}");
    Ok(())
}

pub fn unpair() -> CliResult {
    let config = Config::load()?;
    open_client(&config)?.unpair()?;
    println!("unpaired");
    Ok(())
}
