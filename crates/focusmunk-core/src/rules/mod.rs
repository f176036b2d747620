//! Navigation rules: verdict types, the allow-list, content platforms and the
//! evaluator that applies them in a fixed precedence order.

mod allow_list;
mod evaluator;
pub mod platform;
pub mod youtube;

use serde::{Deserialize, Serialize};

pub use allow_list::{AllowList, AllowPattern};
pub use evaluator::{RuleEvaluator, BROWSER_INTERNAL_SCHEMES};
pub use platform::{ContentInfo, ContentPlatform};
pub use youtube::YouTube;

/// Outcome of evaluating one navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "camelCase")]
pub enum Decision {
    Allow(AllowReason),
    Block(BlockReason),
    /// The URL is in a platform's restricted class; `platform` indexes the
    /// evaluator's platform registry.
    NeedsSecondaryCheck { platform: usize },
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AllowReason {
    SpecialPage,
    EnforcementOff,
    FreeTime,
    AllowList,
    SafePlatformPage,
    AllowedCreator,
    AllowedKeyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockReason {
    Unconfigured,
    NotAllowed,
    FreeTimeExhausted,
    NoAllowanceToday,
    ContentUnverified,
    ContentNotAllowed,
}

impl BlockReason {
    /// Human-readable text shown on the blocked surface.
    pub fn message(self) -> &'static str {
        match self {
            Self::Unconfigured => "this browser is not set up yet",
            Self::NotAllowed => "site is not on the allow-list",
            Self::FreeTimeExhausted => "free time for today is used up",
            Self::NoAllowanceToday => "no free time is scheduled today",
            Self::ContentUnverified => "could not verify content",
            Self::ContentNotAllowed => "content not from allowed creator or matching keywords",
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}
