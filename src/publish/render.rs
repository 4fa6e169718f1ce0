// src/publish/render.rs
//! Chat rendering for a scored brief item.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::backend::PublishableItem;

/// Hard ceiling for one chat message.
pub const MAX_MESSAGE_CHARS: usize = 1900;
pub const MAX_BULLETS: usize = 5;
/// Bullets kept on the shrunk (second) render.
pub const SHRUNK_BULLETS: usize = 2;
pub const MAX_TAGS: usize = 8;
pub const UNTITLED: &str = "(untitled)";
pub const CONTINUATION: &str = "…";
pub const HIGH_SIGNAL_BANNER: &str = "🚨 **HIGH SIGNAL**";

/// Render within `MAX_MESSAGE_CHARS`: full form, then fewer bullets and no
/// tags, then a hard cut ending in `CONTINUATION`.
pub fn render_item(item: &PublishableItem, vertical: &str) -> String {
    let full = compose(item, vertical, MAX_BULLETS, true);
    if char_len(&full) <= MAX_MESSAGE_CHARS {
        return full;
    }
    let shrunk = compose(item, vertical, SHRUNK_BULLETS, false);
    if char_len(&shrunk) <= MAX_MESSAGE_CHARS {
        return shrunk;
    }
    hard_truncate(&shrunk, MAX_MESSAGE_CHARS)
}

/// Copy for the triage channel.
pub fn render_escalation(rendered: &str) -> String {
    hard_truncate(&format!("{HIGH_SIGNAL_BANNER}\n{rendered}"), MAX_MESSAGE_CHARS)
}

pub(crate) fn compose(item: &PublishableItem, vertical: &str, max_bullets: usize, with_tags: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "**[{}] score {}**",
        vertical.to_uppercase(),
        format_score(item.relevance_score)
    ));

    let title = item
        .title
        .as_deref()
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    lines.push(format!("**{title}**"));

    if let Some(summary) = item.summary.as_deref().map(clean_text).filter(|s| !s.is_empty()) {
        lines.push(summary);
    }

    for b in clean_bullets(&item.bullets).into_iter().take(max_bullets) {
        lines.push(format!("• {b}"));
    }

    if let Some(why) = item
        .why_it_matters
        .as_deref()
        .map(clean_text)
        .filter(|s| !s.is_empty())
    {
        lines.push(format!("**Why it matters:** {why}"));
    }

    if with_tags {
        let tags = clean_tags(&item.tags);
        if !tags.is_empty() {
            lines.push(
                tags.iter()
                    .take(MAX_TAGS)
                    .map(|t| format!("#{t}"))
                    .collect::<Vec<_>>()
                    .join(" "),
            );
        }
    }

    if let Some(url) = item.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        lines.push(format!("<{url}>"));
    }

    lines.join("\n")
}

/// Whole scores print without decimals.
pub fn format_score(score: f64) -> String {
    if score.fract().abs() < f64::EPSILON {
        format!("{score:.0}")
    } else {
        format!("{score:.1}")
    }
}

/// Decode entities, drop tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());

    let decoded = html_escape::decode_html_entities(s);
    let stripped = re_tags.replace_all(&decoded, "");
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

/// Strip leading list markers and drop empty bullets.
pub fn clean_bullets(bullets: &[String]) -> Vec<String> {
    bullets
        .iter()
        .map(|b| {
            clean_text(b)
                .trim_start_matches(['-', '*', '•', '·', '–', '—', '▪', '‣'])
                .trim()
                .to_string()
        })
        .filter(|b| !b.is_empty())
        .collect()
}

/// Tags as `word-word`, without leading `#`, deduplicated case-insensitively.
pub fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|t| {
            clean_text(t)
                .trim_start_matches('#')
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("-")
        })
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn hard_truncate(s: &str, max: usize) -> String {
    if char_len(s) <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(char_len(CONTINUATION));
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(CONTINUATION);
    out
}
