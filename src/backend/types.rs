// src/backend/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Backend identifiers arrive as numbers or strings; echo them back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceId {
    Num(i64),
    Text(String),
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Num(n) => write!(f, "{n}"),
            SourceId::Text(s) => f.write_str(s),
        }
    }
}

/// ETag / Last-Modified pair used for conditional feed requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheValidators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: SourceId,
    pub url: String,
    #[serde(default)]
    pub vertical: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl FeedSource {
    pub fn validators(&self) -> CacheValidators {
        CacheValidators {
            etag: self.etag.clone(),
            last_modified: self.last_modified.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntakeOrigin {
    Discord,
    Rss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestMetadata {
    pub source_id: SourceId,
    pub source_name: String,
    pub source_type: String,
}

/// One candidate link submitted to `/api/ingest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestRequest {
    pub url: String,
    pub vertical: String,
    pub source: IntakeOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<IngestMetadata>,
    pub posted_at: DateTime<Utc>,
}

impl IngestRequest {
    pub fn from_feed(
        link: &str,
        source: &FeedSource,
        source_type: &str,
        posted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            url: link.to_string(),
            vertical: source.vertical.clone(),
            source: IntakeOrigin::Rss,
            source_channel_id: None,
            source_message_id: None,
            author_id: None,
            author_username: None,
            metadata: Some(IngestMetadata {
                source_id: source.id.clone(),
                source_name: source.name.clone(),
                source_type: source_type.to_string(),
            }),
            posted_at,
        }
    }
}

/// Backend decision for one submission. A missing `inserted` means duplicate.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IngestOutcome {
    #[serde(default)]
    pub inserted: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollReport {
    pub source_id: SourceId,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub last_error: Option<String>,
    pub seen_keys: Vec<String>,
}

impl PollReport {
    pub fn success(source: &FeedSource, validators: CacheValidators, seen_keys: Vec<String>) -> Self {
        Self {
            source_id: source.id.clone(),
            etag: validators.etag,
            last_modified: validators.last_modified,
            last_error: None,
            seen_keys,
        }
    }

    /// Keeps the source's last known-good validators.
    pub fn failure(source: &FeedSource, error: String) -> Self {
        Self {
            source_id: source.id.clone(),
            etag: source.etag.clone(),
            last_modified: source.last_modified.clone(),
            last_error: Some(error),
            seen_keys: Vec::new(),
        }
    }
}

/// Backend-scored record waiting to be posted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PublishableItem {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vertical: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relevance_score: f64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub why_it_matters: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bullets: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ProcessSummary {
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub picked: u64,
}

fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}
