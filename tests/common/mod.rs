// tests/common/mod.rs
// In-memory stand-ins for the backend, chat gateway, feed fetcher and ops log.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use brief_relay::backend::{
    Backend, CacheValidators, FeedSource, IngestOutcome, IngestRequest, PollReport,
    ProcessSummary, PublishableItem, SourceId,
};
use brief_relay::chat::{ChannelInfo, ChatGateway};
use brief_relay::error::{RelayError, RelayResult};
use brief_relay::feed::{FeedFetcher, FetchRequest, FetchResponse};
use brief_relay::notify::Notifier;

/// Lets a test hold a call in flight: the callee signals `entered` and
/// waits for `release`.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

// ---------------------------------------------------------------- backend

#[derive(Default)]
pub struct FakeBackend {
    pub sources: Mutex<Vec<FeedSource>>,
    pub list_fails: AtomicBool,
    /// source id -> keys the backend already has
    pub seen: Mutex<HashMap<String, HashSet<String>>>,
    pub seen_queries: Mutex<Vec<Vec<String>>>,
    /// URLs the backend already holds (answered as duplicates).
    pub known_urls: Mutex<HashSet<String>>,
    pub failing_urls: Mutex<HashSet<String>>,
    pub ingest_calls: Mutex<Vec<IngestRequest>>,
    pub reports: Mutex<Vec<PollReport>>,
    /// Reject success reports (those without `last_error`).
    pub fail_success_reports: AtomicBool,
    pub unposted: Mutex<HashMap<String, Vec<PublishableItem>>>,
    pub unposted_calls: AtomicUsize,
    pub unposted_gate: Mutex<Option<Arc<Gate>>>,
    pub marked: Mutex<Vec<i64>>,
    pub process_summary: Mutex<ProcessSummary>,
    pub process_fails: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_seen(&self, source_id: &str, keys: &[&str]) {
        self.seen
            .lock()
            .unwrap()
            .entry(source_id.to_string())
            .or_default()
            .extend(keys.iter().map(|k| k.to_string()));
    }

    pub fn fail_url(&self, url: &str) {
        self.failing_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn know_url(&self, url: &str) {
        self.known_urls.lock().unwrap().insert(url.to_string());
    }

    pub fn queue(&self, vertical: &str, items: Vec<PublishableItem>) {
        self.unposted
            .lock()
            .unwrap()
            .insert(vertical.to_string(), items);
    }

    pub fn ingested_urls(&self) -> Vec<String> {
        self.ingest_calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    pub fn reports(&self) -> Vec<PollReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn marked(&self) -> Vec<i64> {
        self.marked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn ingest(&self, req: &IngestRequest) -> RelayResult<IngestOutcome> {
        self.ingest_calls.lock().unwrap().push(req.clone());
        if self.failing_urls.lock().unwrap().contains(&req.url) {
            return Err(RelayError::status(500, "ingest exploded"));
        }
        let inserted = self.known_urls.lock().unwrap().insert(req.url.clone());
        Ok(IngestOutcome {
            inserted,
            ..Default::default()
        })
    }

    async fn list_sources(&self, limit: usize) -> RelayResult<Vec<FeedSource>> {
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(RelayError::status(503, "unavailable"));
        }
        Ok(self.sources.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn seen_keys(&self, source_id: &SourceId, keys: &[String]) -> RelayResult<Vec<String>> {
        self.seen_queries.lock().unwrap().push(keys.to_vec());
        let seen = self.seen.lock().unwrap();
        let known = seen.get(&source_id.to_string());
        Ok(keys
            .iter()
            .filter(|k| known.is_some_and(|s| s.contains(*k)))
            .cloned()
            .collect())
    }

    async fn report_poll(&self, report: &PollReport) -> RelayResult<()> {
        self.reports.lock().unwrap().push(report.clone());
        if report.last_error.is_none() && self.fail_success_reports.load(Ordering::SeqCst) {
            return Err(RelayError::status(502, "report store down"));
        }
        Ok(())
    }

    async fn unposted(&self, vertical: &str, limit: usize) -> RelayResult<Vec<PublishableItem>> {
        self.unposted_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.unposted_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        Ok(self
            .unposted
            .lock()
            .unwrap()
            .get(vertical)
            .map(|v| v.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn mark_posted(&self, ids: &[i64]) -> RelayResult<u64> {
        self.marked.lock().unwrap().extend_from_slice(ids);
        Ok(ids.len() as u64)
    }

    async fn trigger_processing(&self, _limit: usize) -> RelayResult<ProcessSummary> {
        if self.process_fails.load(Ordering::SeqCst) {
            return Err(RelayError::Decode("not json".into()));
        }
        Ok(*self.process_summary.lock().unwrap())
    }
}

// ---------------------------------------------------------------- chat

#[derive(Default)]
pub struct FakeChat {
    pub sent: Mutex<Vec<(String, String)>>,
    pub reactions: Mutex<Vec<(String, String, String)>>,
    /// Sends whose content contains this substring fail.
    pub fail_when_contains: Mutex<Option<String>>,
    pub fail_reactions: AtomicBool,
    /// Channel kinds; unknown ids are plain text channels.
    pub kinds: Mutex<HashMap<String, u8>>,
    pub missing: Mutex<HashSet<String>>,
}

impl FakeChat {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent_to(&self, channel: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn reactions(&self) -> Vec<String> {
        self.reactions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, e)| e.clone())
            .collect()
    }
}

#[async_trait]
impl ChatGateway for FakeChat {
    async fn send_message(&self, channel_id: &str, content: &str) -> RelayResult<()> {
        if let Some(bad) = self.fail_when_contains.lock().unwrap().as_deref() {
            if content.contains(bad) {
                return Err(RelayError::status(500, "discord down"));
            }
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn react(&self, channel_id: &str, message_id: &str, emoji: &str) -> RelayResult<()> {
        if self.fail_reactions.load(Ordering::SeqCst) {
            return Err(RelayError::status(403, "missing permissions"));
        }
        self.reactions.lock().unwrap().push((
            channel_id.to_string(),
            message_id.to_string(),
            emoji.to_string(),
        ));
        Ok(())
    }

    async fn fetch_channel(&self, channel_id: &str) -> RelayResult<Option<ChannelInfo>> {
        if self.missing.lock().unwrap().contains(channel_id) {
            return Ok(None);
        }
        let kind = self.kinds.lock().unwrap().get(channel_id).copied().unwrap_or(0);
        Ok(Some(ChannelInfo { kind }))
    }
}

// ---------------------------------------------------------------- feeds

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub url: String,
    pub validators: CacheValidators,
    pub user_agent: String,
}

#[derive(Default)]
pub struct FakeFetcher {
    pub responses: Mutex<HashMap<String, FetchResponse>>,
    pub requests: Mutex<Vec<SeenRequest>>,
    pub gate: Mutex<Option<Arc<Gate>>>,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, status: u16, body: &str, etag: Option<&str>) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            FetchResponse {
                status,
                validators: CacheValidators {
                    etag: etag.map(str::to_string),
                    last_modified: None,
                },
                body: body.to_string(),
            },
        );
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch(&self, req: FetchRequest<'_>) -> RelayResult<FetchResponse> {
        self.requests.lock().unwrap().push(SeenRequest {
            url: req.url.to_string(),
            validators: req.validators.clone(),
            user_agent: req.user_agent.to_string(),
        });
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.responses
            .lock()
            .unwrap()
            .get(req.url)
            .cloned()
            .ok_or_else(|| RelayError::Feed(format!("unreachable: {}", req.url)))
    }
}

// ---------------------------------------------------------------- ops log

#[derive(Default)]
pub struct RecordingNotifier {
    pub lines: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

// ---------------------------------------------------------------- builders

pub fn source(id: i64, url: &str) -> FeedSource {
    FeedSource {
        id: SourceId::Num(id),
        url: url.to_string(),
        vertical: "energy".to_string(),
        name: format!("source {id}"),
        etag: None,
        last_modified: None,
    }
}

pub fn item(id: i64, score: f64, title: &str) -> PublishableItem {
    PublishableItem {
        id,
        vertical: "energy".into(),
        relevance_score: score,
        title: Some(title.to_string()),
        summary: Some(format!("summary {id}")),
        url: Some(format!("https://news.example/{id}")),
        ..Default::default()
    }
}

/// RSS document with one item per `(guid, link)`.
pub fn rss(items: &[(&str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(guid, link)| {
            format!("<item><title>t {guid}</title><guid isPermaLink=\"false\">{guid}</guid><link>{link}</link></item>")
        })
        .collect();
    format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>x</title>{body}</channel></rss>"#)
}
