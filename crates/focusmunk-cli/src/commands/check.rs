//! `focusmunk check <url>`: run one URL through the navigation gate.
//!
//! Uses the persisted policy as-is (no refresh first), so the answer matches
//! what the daemon would decide right now. Restricted platform pages still
//! trigger a content lookup against the server.

use std::sync::Arc;

use focusmunk_core::{
    ApiClient, BootstrapSignal, Config, Decision, NavigationGate, RuleEvaluator, SharedCache,
    StateStore,
};
use serde_json::json;

use super::{runtime, CliResult};

pub fn run(url: &str, json: bool) -> CliResult {
    let config = Config::load()?;
    let cache = SharedCache::new(StateStore::open()?.load()?);
    let evaluator = RuleEvaluator::default()
        .with_internal_pages([&config.gate.extension_origin, &config.gate.blocked_page]);
    let gate = NavigationGate::new(
        cache,
        Arc::new(evaluator),
        ApiClient::new(&config.server.url, config.request_timeout())?,
        &config.gate.blocked_page,
        BootstrapSignal::ready(),
    )?;

    let decision = runtime()?.block_on(gate.check(url));

    if json {
        let redirect = match decision {
            Decision::Block(reason) => Some(gate.blocked_url(url, reason)),
            _ => None,
        };
        let out = json!({ "url": url, "decision": decision, "redirect": redirect });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", describe(&decision));
    }
    Ok(())
}

fn describe(decision: &Decision) -> String {
    match decision {
        Decision::Allow(reason) => {
            let label = serde_json::to_value(reason)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default();
            format!("allow ({label})")
        }
        Decision::Block(reason) => format!("block: {reason}"),
        Decision::NeedsSecondaryCheck { .. } => "block: could not verify content".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusmunk_core::{AllowReason, BlockReason};

    #[test]
    fn describes_verdicts() {
        assert_eq!(
            describe(&Decision::Allow(AllowReason::AllowList)),
            "allow (allowList)"
        );
        assert_eq!(
            describe(&Decision::Block(BlockReason::NotAllowed)),
            "block: site is not on the allow-list"
        );
    }
}
