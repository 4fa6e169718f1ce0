// src/config/verticals.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_VERTICALS_PATH: &str = "VERTICALS_PATH";

/// Channels attached to one vertical.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerticalConfig {
    pub name: String,
    /// Chat channel whose pasted links are ingested under this vertical.
    #[serde(default)]
    pub intake_channel: Option<String>,
    /// Chat channel that receives published briefs.
    #[serde(default)]
    pub output_channel: Option<String>,
}

/// Load verticals from an explicit path. Supports TOML or JSON formats.
pub fn load_verticals_from(path: &Path) -> Result<Vec<VerticalConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading verticals from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_verticals(&content, ext.as_str())
}

/// Load verticals using env var + fallbacks:
/// 1) $VERTICALS_PATH
/// 2) config/verticals.toml
/// 3) config/verticals.json
pub fn load_verticals_default() -> Result<Vec<VerticalConfig>> {
    if let Ok(p) = std::env::var(ENV_VERTICALS_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_VERTICALS_PATH} points to non-existent path"));
        }
        return load_verticals_from(&pb);
    }
    for candidate in ["config/verticals.toml", "config/verticals.json"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_verticals_from(&p);
        }
    }
    Err(anyhow!(
        "no verticals configured (set {ENV_VERTICALS_PATH} or add config/verticals.toml)"
    ))
}

fn parse_verticals(s: &str, hint_ext: &str) -> Result<Vec<VerticalConfig>> {
    let parsed = if hint_ext == "json" {
        parse_json(s)
    } else {
        parse_toml(s).or_else(|_| parse_json(s))
    };
    clean(parsed.context("unsupported verticals format")?)
}

fn parse_toml(s: &str) -> Result<Vec<VerticalConfig>> {
    #[derive(Deserialize)]
    struct TomlVerticals {
        #[serde(rename = "vertical")]
        verticals: Vec<VerticalConfig>,
    }
    let v: TomlVerticals = toml::from_str(s)?;
    Ok(v.verticals)
}

fn parse_json(s: &str) -> Result<Vec<VerticalConfig>> {
    Ok(serde_json::from_str(s)?)
}

/// Trim names and channel ids, drop blanks, reject duplicates and empty sets.
fn clean(items: Vec<VerticalConfig>) -> Result<Vec<VerticalConfig>> {
    let mut by_name = BTreeMap::new();
    for it in items {
        let name = it.name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        let v = VerticalConfig {
            name: name.clone(),
            intake_channel: trimmed(it.intake_channel),
            output_channel: trimmed(it.output_channel),
        };
        if by_name.insert(name.clone(), v).is_some() {
            return Err(anyhow!("vertical {name} configured twice"));
        }
    }
    if by_name.is_empty() {
        return Err(anyhow!("verticals list is empty"));
    }
    Ok(by_name.into_values().collect())
}

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
