// src/feed/keys.rs
//! Stable identity and canonical link for a feed entry.

use super::parse::RawEntry;

/// Seen keys longer than this are cut (the backend indexes them).
pub const MAX_KEY_CHARS: usize = 512;

/// An entry that can be forwarded: both key and link are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub key: String,
    pub link: String,
}

/// Canonical link: structured `<link href>` set preferring `rel="alternate"`,
/// else the first href, else the plain text value. Angle brackets are stripped.
pub fn item_link(entry: &RawEntry) -> String {
    let hrefs: Vec<_> = entry
        .links
        .iter()
        .filter_map(|l| {
            let href = l.href.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
            Some((href, l.rel.as_deref()))
        })
        .collect();

    let picked = hrefs
        .iter()
        .find(|(_, rel)| rel.is_some_and(|r| r.trim().eq_ignore_ascii_case("alternate")))
        .or_else(|| hrefs.first())
        .map(|(href, _)| *href)
        .or_else(|| {
            entry
                .links
                .iter()
                .filter_map(|l| l.value.as_deref().map(str::trim))
                .find(|v| !v.is_empty())
        })
        .unwrap_or_default();

    strip_angle_brackets(picked).to_string()
}

/// Key priority: guid, then id, then canonical link, then title.
pub fn item_key(entry: &RawEntry) -> String {
    let link = item_link(entry);
    let raw = entry
        .guid
        .as_ref()
        .and_then(|g| g.text())
        .or_else(|| entry.id.as_ref().and_then(|i| i.text()))
        .or(Some(link.as_str()).filter(|l| !l.is_empty()))
        .or_else(|| entry.title.as_ref().and_then(|t| t.text()))
        .unwrap_or_default();

    raw.chars().take(MAX_KEY_CHARS).collect()
}

/// `None` when either the key or the link is empty.
pub fn normalize_item(entry: &RawEntry) -> Option<FeedItem> {
    let key = item_key(entry);
    let link = item_link(entry);
    if key.is_empty() || link.is_empty() {
        return None;
    }
    Some(FeedItem { key, link })
}

fn strip_angle_brackets(s: &str) -> &str {
    let s = s.trim();
    let s = s.strip_prefix('<').unwrap_or(s);
    let s = s.strip_suffix('>').unwrap_or(s);
    s.trim()
}
