// src/feed/poller.rs
use anyhow::{Context, Result};
use chrono::Utc;
use metrics::counter;
use std::collections::HashSet;
use std::sync::Arc;

use super::fetch::{FeedFetcher, FetchRequest};
use super::keys::{normalize_item, FeedItem};
use super::parse::{pick_items, FeedDocument};
use crate::backend::{Backend, FeedSource, IngestRequest, PollReport};
use crate::config::FeedSettings;
use crate::error::RelayError;
use crate::guard::CycleGuard;
use crate::links::{domain_matches, domain_of};
use crate::notify::Notifier;

pub const SOURCE_TYPE_FEED: &str = "rss";
pub const SOURCE_TYPE_CORPORATE: &str = "corporate";

/// Per-source outcome of one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollCounts {
    /// Entries considered after the per-source cap.
    pub fetched: usize,
    /// Fresh inserts on the backend.
    pub ingested: usize,
    /// Accepted by the backend as duplicates.
    pub skipped: usize,
    /// Ingestion calls that failed; retried next poll.
    pub failed: usize,
}

impl PollCounts {
    fn add(&mut self, other: PollCounts) {
        self.fetched += other.fetched;
        self.ingested += other.ingested;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub sources: usize,
    pub failed_sources: usize,
    pub totals: PollCounts,
}

/// Polls backend-registered feeds and forwards unseen entries for ingestion.
pub struct FeedPoller {
    backend: Arc<dyn Backend>,
    fetcher: Arc<dyn FeedFetcher>,
    notifier: Arc<dyn Notifier>,
    settings: FeedSettings,
    guard: CycleGuard,
}

impl FeedPoller {
    pub fn new(
        backend: Arc<dyn Backend>,
        fetcher: Arc<dyn FeedFetcher>,
        notifier: Arc<dyn Notifier>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            backend,
            fetcher,
            notifier,
            settings,
            guard: CycleGuard::new(),
        }
    }

    /// One full cycle over all sources. `None` when a cycle is already running.
    pub async fn poll_all(&self) -> Option<CycleSummary> {
        let Some(_permit) = self.guard.try_enter() else {
            tracing::debug!(target: "feed", "poll cycle already running; skipped");
            return None;
        };

        let mut summary = CycleSummary::default();
        let sources = match self.backend.list_sources(self.settings.max_sources).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(target: "feed", error = %e, "listing feed sources failed");
                self.notifier
                    .notify(&format!("rss poll: listing sources failed: {e}"))
                    .await;
                return Some(summary);
            }
        };

        for source in sources.iter().take(self.settings.max_sources) {
            summary.sources += 1;
            counter!("feed_sources_polled_total").increment(1);
            match self.poll_source(source).await {
                Ok(counts) => summary.totals.add(counts),
                Err(e) => {
                    summary.failed_sources += 1;
                    counter!("feed_source_errors_total").increment(1);
                    tracing::warn!(
                        target: "feed",
                        source_id = %source.id,
                        url = %source.url,
                        error = %format!("{e:#}"),
                        "feed poll failed"
                    );
                }
            }
        }

        tracing::info!(
            target: "feed",
            sources = summary.sources,
            failed_sources = summary.failed_sources,
            ingested = summary.totals.ingested,
            skipped = summary.totals.skipped,
            "poll cycle done"
        );
        if summary.totals.ingested > 0 {
            self.notifier
                .notify(&format!(
                    "rss poll: sources={} ingested={} skipped={} failed_sources={}",
                    summary.sources,
                    summary.totals.ingested,
                    summary.totals.skipped,
                    summary.failed_sources
                ))
                .await;
        }
        Some(summary)
    }

    /// Poll one source. On failure the error is reported with the source's
    /// prior validators and then returned.
    pub async fn poll_source(&self, source: &FeedSource) -> Result<PollCounts> {
        match self.poll_source_inner(source).await {
            Ok(counts) => Ok(counts),
            // Also reached when the success report itself fails: the failure
            // report then carries no seen keys, so entries ingested this poll
            // are offered again next time and the backend answers duplicate.
            Err(e) => {
                let report = PollReport::failure(source, format!("{e:#}"));
                if let Err(report_err) = self.backend.report_poll(&report).await {
                    tracing::warn!(
                        target: "feed",
                        source_id = %source.id,
                        error = %report_err,
                        "reporting poll failure failed"
                    );
                }
                Err(e)
            }
        }
    }

    async fn poll_source_inner(&self, source: &FeedSource) -> Result<PollCounts> {
        let domain = domain_of(&source.url).unwrap_or_default();
        let rate_sensitive = self
            .settings
            .rate_sensitive_domains
            .iter()
            .any(|d| domain_matches(&domain, d));

        let user_agent = if rate_sensitive {
            tokio::time::sleep(self.settings.politeness_delay).await;
            self.settings
                .alt_user_agent
                .as_deref()
                .unwrap_or(self.settings.user_agent.as_str())
        } else {
            self.settings.user_agent.as_str()
        };
        let source_type = if rate_sensitive {
            SOURCE_TYPE_CORPORATE
        } else {
            SOURCE_TYPE_FEED
        };

        let prior = source.validators();
        let resp = self
            .fetcher
            .fetch(FetchRequest {
                url: &source.url,
                validators: &prior,
                user_agent,
            })
            .await
            .context("fetching feed")?;

        if resp.is_not_modified() {
            tracing::debug!(target: "feed", source_id = %source.id, "not modified");
            self.backend
                .report_poll(&PollReport::success(source, prior, Vec::new()))
                .await
                .context("reporting not-modified poll")?;
            return Ok(PollCounts::default());
        }
        if !resp.is_success() {
            return Err(RelayError::status(resp.status, &resp.body).into());
        }

        let doc = FeedDocument::parse(&resp.body)?;
        let entries = pick_items(&doc);
        let capped = &entries[..entries.len().min(self.settings.max_items_per_source)];

        let mut keys_in_doc = HashSet::new();
        let candidates: Vec<FeedItem> = capped
            .iter()
            .filter_map(normalize_item)
            .filter(|it| keys_in_doc.insert(it.key.clone()))
            .collect();

        let mut counts = PollCounts {
            fetched: capped.len(),
            ..Default::default()
        };

        let keys: Vec<String> = candidates.iter().map(|c| c.key.clone()).collect();
        let seen: HashSet<String> = if keys.is_empty() {
            HashSet::new()
        } else {
            self.backend
                .seen_keys(&source.id, &keys)
                .await
                .context("checking seen keys")?
                .into_iter()
                .collect()
        };

        let mut newly_seen = Vec::new();
        for item in candidates.iter().filter(|c| !seen.contains(&c.key)) {
            let req = IngestRequest::from_feed(&item.link, source, source_type, Utc::now());
            match self.backend.ingest(&req).await {
                Ok(outcome) => {
                    if outcome.inserted {
                        counts.ingested += 1;
                        counter!("feed_items_ingested_total").increment(1);
                    } else {
                        counts.skipped += 1;
                        counter!("feed_items_skipped_total").increment(1);
                    }
                    newly_seen.push(item.key.clone());
                }
                Err(e) => {
                    counts.failed += 1;
                    counter!("feed_item_errors_total").increment(1);
                    tracing::warn!(
                        target: "feed",
                        source_id = %source.id,
                        link = %item.link,
                        error = %e,
                        "ingest failed; will retry next poll"
                    );
                }
            }
        }

        self.backend
            .report_poll(&PollReport::success(source, resp.validators, newly_seen))
            .await
            .context("reporting poll")?;

        tracing::debug!(
            target: "feed",
            source_id = %source.id,
            kind = doc.kind(),
            fetched = counts.fetched,
            ingested = counts.ingested,
            skipped = counts.skipped,
            failed = counts.failed,
            "source polled"
        );
        Ok(counts)
    }
}
