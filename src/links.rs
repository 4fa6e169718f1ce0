// src/links.rs
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;

/// All distinct http(s) URLs in `text`, in order of first appearance.
/// Trailing sentence punctuation and closing brackets are not part of the URL.
pub fn extract_urls(text: &str) -> Vec<String> {
    static RE_URL: OnceCell<Regex> = OnceCell::new();
    let re = RE_URL.get_or_init(|| Regex::new(r#"(?i)https?://[^\s<>"]+"#).unwrap());

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for m in re.find_iter(text) {
        let url = m
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '*', '_', '|']);
        if url.split_once("://").map_or(true, |(_, rest)| rest.is_empty()) {
            continue;
        }
        if seen.insert(url.to_string()) {
            out.push(url.to_string());
        }
    }
    out
}

/// Lowercased host without a leading `www.`.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// `domain` equals `pattern` or is a subdomain of it.
pub fn domain_matches(domain: &str, pattern: &str) -> bool {
    let pattern = pattern.trim().trim_start_matches("www.").to_ascii_lowercase();
    if pattern.is_empty() {
        return false;
    }
    domain == pattern || domain.ends_with(&format!(".{pattern}"))
}
