//! YouTube URL classes and creator normalization.

use url::Url;

use super::platform::ContentPlatform;

const HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];
const SHORT_HOST: &str = "youtu.be";

/// Path prefixes that identify a channel in URLs and allow-list entries.
const CHANNEL_PREFIXES: &[&str] = &["@", "c/", "channel/", "user/"];

#[derive(Debug, Default, Clone, Copy)]
pub struct YouTube;

impl YouTube {
    fn is_youtube_host(url: &Url) -> bool {
        url.host_str()
            .map(|h| HOSTS.contains(&h.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn is_short_link(url: &Url) -> bool {
        url.host_str()
            .is_some_and(|h| h.eq_ignore_ascii_case(SHORT_HOST))
    }

    fn first_segment(url: &Url) -> Option<String> {
        url.path_segments()?
            .find(|s| !s.is_empty())
            .map(|s| s.to_ascii_lowercase())
    }

    /// Second non-empty path segment, e.g. the id in `/shorts/{id}`.
    fn has_id_segment(url: &Url) -> bool {
        url.path_segments()
            .map(|mut segs| segs.filter(|s| !s.is_empty()).nth(1).is_some())
            .unwrap_or(false)
    }
}

impl ContentPlatform for YouTube {
    fn name(&self) -> &str {
        "youtube"
    }

    fn matches_safe_class(&self, url: &Url) -> bool {
        if !Self::is_youtube_host(url) {
            return false;
        }
        match Self::first_segment(url).as_deref() {
            None => true,
            Some("feed" | "results") => true,
            Some(seg) if seg.starts_with('@') => true,
            Some("c" | "channel" | "user") => true,
            _ => false,
        }
    }

    fn matches_restricted_class(&self, url: &Url) -> bool {
        if Self::is_short_link(url) {
            return Self::first_segment(url).is_some();
        }
        if !Self::is_youtube_host(url) {
            return false;
        }
        match Self::first_segment(url).as_deref() {
            Some("watch") => url.query_pairs().any(|(k, v)| k == "v" && !v.is_empty()),
            Some("shorts" | "embed" | "live") => Self::has_id_segment(url),
            _ => false,
        }
    }

    /// Lowercase, drop scheme, `www.` and the YouTube host, drop one channel
    /// prefix (`@`, `c/`, `channel/`, `user/`) and keep only the first path
    /// segment. `https://www.youtube.com/@JaneDoe/videos` becomes `janedoe`.
    fn normalize_creator(&self, raw: &str) -> String {
        let lowered = raw.trim().to_lowercase();
        let mut rest = lowered.as_str();

        for scheme in ["https://", "http://"] {
            if let Some(stripped) = rest.strip_prefix(scheme) {
                rest = stripped;
                break;
            }
        }
        rest = rest.strip_prefix("www.").unwrap_or(rest);
        for host in ["youtube.com", "m.youtube.com", "music.youtube.com"] {
            if let Some(stripped) = rest.strip_prefix(host) {
                rest = stripped;
                break;
            }
        }
        rest = rest.trim_start_matches('/');

        for prefix in CHANNEL_PREFIXES {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped;
                break;
            }
        }

        rest.split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}
