//! Content-platform extension points.
//!
//! A platform claims a family of URLs and splits them into a *safe* class
//! (browsable without looking at the content) and a *restricted* class that
//! needs a remote title/author lookup before a verdict can be reached.
//! Platforms are stateless; the only inputs to a secondary verdict are the
//! lookup result and the two content allow-lists on the snapshot.

use serde::{Deserialize, Serialize};
use url::Url;

use super::{AllowReason, BlockReason, Decision};
use crate::policy::PolicySnapshot;

/// Result of a content lookup (`GET /content-info`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_url: Option<String>,
}

/// A content platform with its own URL classes and creator identity rules.
pub trait ContentPlatform: Send + Sync {
    /// Short identifier used in logs (e.g. "youtube").
    fn name(&self) -> &str;

    /// Browsable pages that never need a content lookup.
    fn matches_safe_class(&self, url: &Url) -> bool;

    /// Pages whose verdict depends on what is being shown.
    fn matches_restricted_class(&self, url: &Url) -> bool;

    /// Canonical form of a creator name, handle or channel URL.
    fn normalize_creator(&self, raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    /// Verdict for restricted content once its metadata is known.
    ///
    /// Creator match first (bidirectional substring on normalized forms),
    /// then keyword match on the title. Anything else is blocked.
    fn evaluate_content(&self, info: &ContentInfo, snapshot: &PolicySnapshot) -> Decision {
        let creators: Vec<String> = snapshot
            .content_creator_allow_list
            .iter()
            .map(|c| self.normalize_creator(c))
            .filter(|c| !c.is_empty())
            .collect();

        let authors: Vec<String> = [info.author_name.as_deref(), info.author_url.as_deref()]
            .into_iter()
            .flatten()
            .map(|a| self.normalize_creator(a))
            .filter(|a| !a.is_empty())
            .collect();

        if authors.iter().any(|a| creator_matches(a, &creators)) {
            return Decision::Allow(AllowReason::AllowedCreator);
        }

        let title = info.title.as_deref().unwrap_or_default();
        if title_matches_keywords(title, &snapshot.content_keyword_allow_list) {
            return Decision::Allow(AllowReason::AllowedKeyword);
        }

        Decision::Block(BlockReason::ContentNotAllowed)
    }
}

/// Equal to, containing, or contained in any entry.
pub fn creator_matches(author: &str, normalized_entries: &[String]) -> bool {
    normalized_entries
        .iter()
        .any(|entry| author == entry || author.contains(entry.as_str()) || entry.contains(author))
}

/// Case-insensitive substring match of any non-blank keyword.
pub fn title_matches_keywords(title: &str, keywords: &[String]) -> bool {
    let title = title.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .any(|k| title.contains(&k))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl ContentPlatform for Plain {
        fn name(&self) -> &str {
            "plain"
        }
        fn matches_safe_class(&self, _url: &Url) -> bool {
            false
        }
        fn matches_restricted_class(&self, _url: &Url) -> bool {
            true
        }
    }

    fn info(title: &str, author: &str) -> ContentInfo {
        ContentInfo {
            title: Some(title.into()),
            author_name: Some(author.into()),
            author_url: None,
        }
    }

    #[test]
    fn keyword_match_allows_without_creator() {
        let mut snapshot = PolicySnapshot::new("ABCD-1234");
        snapshot.content_keyword_allow_list = vec!["lecture".into()];
        let verdict = Plain.evaluate_content(&info("Algebra Lecture 1", "Jane Doe"), &snapshot);
        assert_eq!(verdict, Decision::Allow(AllowReason::AllowedKeyword));
    }

    #[test]
    fn creator_match_is_bidirectional() {
        let mut snapshot = PolicySnapshot::new("ABCD-1234");
        snapshot.content_creator_allow_list = vec!["Jane".into()];
        assert_eq!(
            Plain.evaluate_content(&info("Vlog", "Jane Doe"), &snapshot),
            Decision::Allow(AllowReason::AllowedCreator)
        );

        snapshot.content_creator_allow_list = vec!["Jane Doe Official".into()];
        assert_eq!(
            Plain.evaluate_content(&info("Vlog", "jane doe"), &snapshot),
            Decision::Allow(AllowReason::AllowedCreator)
        );
    }

    #[test]
    fn empty_metadata_never_matches() {
        let mut snapshot = PolicySnapshot::new("ABCD-1234");
        snapshot.content_creator_allow_list = vec!["someone".into()];
        snapshot.content_keyword_allow_list = vec!["".into()];
        assert_eq!(
            Plain.evaluate_content(&ContentInfo::default(), &snapshot),
            Decision::Block(BlockReason::ContentNotAllowed)
        );
    }

    #[test]
    fn evaluation_is_repeatable() {
        let mut snapshot = PolicySnapshot::new("ABCD-1234");
        snapshot.content_keyword_allow_list = vec!["rust".into()];
        let content = info("Cooking show", "Chef");
        let first = Plain.evaluate_content(&content, &snapshot);
        let second = Plain.evaluate_content(&content, &snapshot);
        assert_eq!(first, second);
        assert_eq!(first, Decision::Block(BlockReason::ContentNotAllowed));
    }
}
