// src/config/mod.rs
pub mod verticals;

pub use verticals::{load_verticals_default, load_verticals_from, VerticalConfig};

use std::ops::RangeInclusive;
use std::time::Duration;

use crate::error::RelayError;

pub const DEFAULT_USER_AGENT: &str = "brief-relay/0.1 (+feed intake)";

#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    /// Max sources listed per poll cycle.
    pub max_sources: usize,
    /// Items beyond this per document are ignored for the cycle.
    pub max_items_per_source: usize,
    pub rate_sensitive_domains: Vec<String>,
    pub politeness_delay: Duration,
    pub user_agent: String,
    /// Replaces `user_agent` for rate-sensitive domains.
    pub alt_user_agent: Option<String>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            max_sources: 200,
            max_items_per_source: 50,
            rate_sensitive_domains: Vec::new(),
            politeness_delay: Duration::from_millis(1500),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            alt_user_agent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishSettings {
    pub limit: usize,
    /// Inclusive score at which an item is escalated to triage.
    pub escalation_threshold: f64,
    pub triage_channel: Option<String>,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            limit: 10,
            escalation_threshold: 80.0,
            triage_channel: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleSettings {
    pub feed_interval: Duration,
    pub process_interval: Duration,
    pub publish_interval: Duration,
    pub process_initial_delay: Duration,
    pub process_limit: usize,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            feed_interval: Duration::from_secs(900),
            process_interval: Duration::from_secs(600),
            publish_interval: Duration::from_secs(300),
            process_initial_delay: Duration::from_secs(30),
            process_limit: 25,
        }
    }
}

/// Process-wide settings read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend_url: String,
    pub backend_secret: String,
    pub process_url: String,
    pub discord_token: String,
    pub discord_api_base: Option<String>,
    pub ops_channel: Option<String>,
    pub bind_addr: String,
    pub http_timeout: Duration,
    pub feed: FeedSettings,
    pub publish: PublishSettings,
    pub schedule: ScheduleSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup. Missing required keys are fatal; tunables
    /// out of range fall back to their defaults.
    pub fn from_lookup<F>(get: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |k: &str| get(k).ok_or_else(|| RelayError::Config(format!("{k} is not set")));

        let backend_url = required("BACKEND_URL")?.trim_end_matches('/').to_string();
        let backend_secret = required("BACKEND_SECRET")?;
        let discord_token = required("DISCORD_TOKEN")?;
        let process_url =
            get("PROCESS_URL").unwrap_or_else(|| format!("{backend_url}/api/process"));

        let feed_defaults = FeedSettings::default();
        let feed = FeedSettings {
            max_sources: bounded(get("RSS_MAX_SOURCES"), 200, 1..=1000, "RSS_MAX_SOURCES") as usize,
            max_items_per_source: bounded(get("RSS_MAX_ITEMS"), 50, 1..=500, "RSS_MAX_ITEMS")
                as usize,
            rate_sensitive_domains: get("RSS_RATE_SENSITIVE_DOMAINS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            politeness_delay: Duration::from_millis(bounded(
                get("RSS_POLITENESS_DELAY_MS"),
                1500,
                0..=30_000,
                "RSS_POLITENESS_DELAY_MS",
            )),
            user_agent: get("RSS_USER_AGENT").unwrap_or(feed_defaults.user_agent),
            alt_user_agent: get("RSS_ALT_USER_AGENT"),
        };

        let publish = PublishSettings {
            limit: bounded(get("PUBLISH_LIMIT"), 10, 1..=50, "PUBLISH_LIMIT") as usize,
            escalation_threshold: threshold(get("TRIAGE_THRESHOLD"), 80.0),
            triage_channel: get("TRIAGE_CHANNEL_ID"),
        };

        let schedule = ScheduleSettings {
            feed_interval: secs(bounded(get("RSS_POLL_SECS"), 900, 60..=86_400, "RSS_POLL_SECS")),
            process_interval: secs(bounded(
                get("PROCESS_INTERVAL_SECS"),
                600,
                60..=86_400,
                "PROCESS_INTERVAL_SECS",
            )),
            publish_interval: secs(bounded(
                get("PUBLISH_INTERVAL_SECS"),
                300,
                60..=86_400,
                "PUBLISH_INTERVAL_SECS",
            )),
            process_initial_delay: secs(bounded(
                get("PROCESS_INITIAL_DELAY_SECS"),
                30,
                20..=600,
                "PROCESS_INITIAL_DELAY_SECS",
            )),
            process_limit: bounded(get("PROCESS_LIMIT"), 25, 1..=200, "PROCESS_LIMIT") as usize,
        };

        Ok(Self {
            backend_url,
            backend_secret,
            process_url,
            discord_token,
            discord_api_base: get("DISCORD_API_BASE"),
            ops_channel: get("OPS_CHANNEL_ID"),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            http_timeout: secs(bounded(get("HTTP_TIMEOUT_SECS"), 30, 1..=300, "HTTP_TIMEOUT_SECS")),
            feed,
            publish,
            schedule,
        })
    }

    /// Shared reqwest client for backend, feeds and chat.
    pub fn http_client(&self) -> Result<reqwest::Client, RelayError> {
        reqwest::Client::builder()
            .user_agent(&self.feed.user_agent)
            .connect_timeout(Duration::from_secs(10))
            .timeout(self.http_timeout)
            .build()
            .map_err(RelayError::from)
    }
}

/// Parse an integer setting; non-numeric or out-of-range values use `default`.
pub fn bounded(raw: Option<String>, default: u64, range: RangeInclusive<u64>, key: &str) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(v) if range.contains(&v) => v,
        _ => {
            tracing::warn!(
                key,
                value = %raw,
                default,
                "setting out of range or not a number; using default"
            );
            default
        }
    }
}

fn threshold(raw: Option<String>, default: f64) -> f64 {
    raw.and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

fn secs(v: u64) -> Duration {
    Duration::from_secs(v)
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
