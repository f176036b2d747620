//! Compiled URL allow-list.

use regex::{Regex, RegexBuilder};

/// One allow-list entry.
///
/// Entries are compiled as case-insensitive regexes. An entry that is not a
/// valid regex is kept as a literal and matched by case-insensitive substring
/// containment, so a typo never silently drops a rule.
#[derive(Debug, Clone)]
pub enum AllowPattern {
    Regex(Regex),
    Literal(String),
}

impl AllowPattern {
    /// Compile a pattern. Returns `None` for blank entries.
    pub fn compile(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match RegexBuilder::new(raw).case_insensitive(true).build() {
            Ok(re) => Some(Self::Regex(re)),
            Err(err) => {
                tracing::debug!(pattern = raw, error = %err, "allow-list entry is not a regex, matching literally");
                Some(Self::Literal(raw.to_lowercase()))
            }
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Regex(re) => re.is_match(url),
            Self::Literal(needle) => url.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Ordered, compiled allow-list.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    source: Vec<String>,
    patterns: Vec<AllowPattern>,
}

impl AllowList {
    pub fn compile(entries: &[String]) -> Self {
        Self {
            source: entries.to_vec(),
            patterns: entries.iter().filter_map(|e| AllowPattern::compile(e)).collect(),
        }
    }

    /// Whether this list was compiled from exactly `entries`.
    pub fn compiled_from(&self, entries: &[String]) -> bool {
        self.source == entries
    }

    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(url))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
