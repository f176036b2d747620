use clap::Subcommand;
use focusmunk_core::api::PolicyUpdate;
use focusmunk_core::{Config, DailyBudget};

use super::{open_client, runtime, split_list, CliResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Replace policy fields on the server. Only the given fields change.
    Update {
        #[arg(long)]
        password: String,
        /// Allowed sites, comma-separated
        #[arg(long)]
        allow: Option<String>,
        /// Allowed video title keywords, comma-separated
        #[arg(long)]
        keywords: Option<String>,
        /// Allowed creators, comma-separated
        #[arg(long)]
        creators: Option<String>,
        /// Free-time minutes per day, either one number or seven
        /// comma-separated numbers starting Monday
        #[arg(long)]
        daily_minutes: Option<String>,
    },
    /// Change the settings password
    ChangePassword {
        #[arg(long)]
        password: String,
        #[arg(long)]
        new_password: String,
    },
}

pub fn run(action: SettingsAction) -> CliResult {
    let config = Config::load()?;
    let client = open_client(&config)?;
    match action {
        SettingsAction::Update {
            password,
            allow,
            keywords,
            creators,
            daily_minutes,
        } => {
            let update = PolicyUpdate {
                whitelist: allow.as_deref().map(split_list),
                youtube_keywords: keywords.as_deref().map(split_list),
                youtube_creators: creators.as_deref().map(split_list),
                daily_free_minutes: daily_minutes.as_deref().map(parse_minutes).transpose()?,
            };
            if update.is_empty() {
                return Err("nothing to update".into());
            }
            runtime()?.block_on(client.update_policy(&password, &update))?;
            println!("settings saved");
        }
        SettingsAction::ChangePassword {
            password,
            new_password,
        } => {
            if new_password.chars().count() < 4 {
                return Err("new password must be at least 4 characters".into());
            }
            runtime()?.block_on(client.change_password(&password, &new_password))?;
            println!("password changed");
        }
    }
    Ok(())
}

fn parse_minutes(raw: &str) -> Result<DailyBudget, String> {
    let values = raw
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 0)
                .ok_or_else(|| format!("invalid minutes value '{}'", v.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
        [all] => Ok(DailyBudget::uniform(*all)),
        [mon, tue, wed, thu, fri, sat, sun] => Ok(DailyBudget {
            mon: *mon,
            tue: *tue,
            wed: *wed,
            thu: *thu,
            fri: *fri,
            sat: *sat,
            sun: *sun,
        }),
        _ => Err("expected one value or seven (Monday first)".into()),
    }
}
