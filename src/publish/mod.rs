// src/publish/mod.rs
pub mod render;

use anyhow::{Context, Result};
use metrics::counter;
use std::sync::Arc;

use crate::backend::Backend;
use crate::chat::ChatGateway;
use crate::config::{PublishSettings, VerticalConfig};
use crate::guard::KeyedGuard;
use crate::notify::Notifier;
use render::{format_score, render_escalation, render_item};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No usable output channel for the vertical.
    Skipped,
    /// Another cycle for the same vertical is in flight.
    Busy,
    /// Nothing waiting on the backend.
    Idle,
    Published { posted: usize, escalated: usize },
    /// Error logged to the ops channel; earlier items may have been posted.
    Failed,
}

/// Posts backend-scored items to per-vertical channels and marks them posted.
pub struct Publisher {
    backend: Arc<dyn Backend>,
    chat: Arc<dyn ChatGateway>,
    notifier: Arc<dyn Notifier>,
    verticals: Vec<VerticalConfig>,
    settings: PublishSettings,
    locks: KeyedGuard,
}

impl Publisher {
    pub fn new(
        backend: Arc<dyn Backend>,
        chat: Arc<dyn ChatGateway>,
        notifier: Arc<dyn Notifier>,
        verticals: Vec<VerticalConfig>,
        settings: PublishSettings,
    ) -> Self {
        Self {
            backend,
            chat,
            notifier,
            verticals,
            settings,
            locks: KeyedGuard::new(),
        }
    }

    /// Every configured vertical, one after another.
    pub async fn publish_all(&self) -> Vec<(String, PublishOutcome)> {
        let mut out = Vec::with_capacity(self.verticals.len());
        for v in &self.verticals {
            out.push((v.name.clone(), self.publish_vertical(v).await));
        }
        out
    }

    pub async fn publish_vertical(&self, vertical: &VerticalConfig) -> PublishOutcome {
        let Some(channel) = vertical.output_channel.as_deref() else {
            tracing::debug!(target: "publish", vertical = %vertical.name, "no output channel; skipped");
            return PublishOutcome::Skipped;
        };
        let Some(_permit) = self.locks.try_enter(&vertical.name) else {
            tracing::debug!(target: "publish", vertical = %vertical.name, "publish already running; skipped");
            return PublishOutcome::Busy;
        };

        match self.run_cycle(&vertical.name, channel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                counter!("publish_failures_total").increment(1);
                tracing::warn!(target: "publish", vertical = %vertical.name, error = %format!("{e:#}"), "publish cycle failed");
                self.notifier
                    .notify(&format!("publish {} failed: {e:#}", vertical.name))
                    .await;
                PublishOutcome::Failed
            }
        }
    }

    async fn run_cycle(&self, vertical: &str, channel: &str) -> Result<PublishOutcome> {
        if !self.text_channel(channel).await? {
            tracing::warn!(target: "publish", vertical, channel, "output channel missing or not text-capable");
            return Ok(PublishOutcome::Skipped);
        }

        let items = self
            .backend
            .unposted(vertical, self.settings.limit)
            .await
            .context("fetching unposted items")?;
        if items.is_empty() {
            return Ok(PublishOutcome::Idle);
        }

        let triage = match self.settings.triage_channel.as_deref() {
            Some(t) => {
                if self.text_channel(t).await? {
                    Some(t)
                } else {
                    tracing::warn!(target: "publish", channel = t, "triage channel missing or not text-capable");
                    None
                }
            }
            None => None,
        };

        let (mut posted, mut escalated) = (0, 0);
        for item in &items {
            let message = render_item(item, vertical);
            self.chat
                .send_message(channel, &message)
                .await
                .with_context(|| format!("posting item {}", item.id))?;
            counter!("publish_posts_total").increment(1);

            if let Some(triage) = triage {
                if item.relevance_score >= self.settings.escalation_threshold {
                    self.chat
                        .send_message(triage, &render_escalation(&message))
                        .await
                        .with_context(|| format!("escalating item {}", item.id))?;
                    escalated += 1;
                    counter!("publish_escalations_total").increment(1);
                    self.notifier
                        .notify(&format!(
                            "triage: escalated item {} ({vertical}, score {})",
                            item.id,
                            format_score(item.relevance_score)
                        ))
                        .await;
                }
            }

            self.backend
                .mark_posted(&[item.id])
                .await
                .with_context(|| format!("marking item {} posted", item.id))?;
            posted += 1;
            tracing::info!(
                target: "publish",
                vertical,
                item_id = item.id,
                score = item.relevance_score,
                "item published"
            );
        }

        Ok(PublishOutcome::Published { posted, escalated })
    }

    async fn text_channel(&self, channel: &str) -> Result<bool> {
        let info = self
            .chat
            .fetch_channel(channel)
            .await
            .with_context(|| format!("looking up channel {channel}"))?;
        Ok(info.is_some_and(|c| c.is_text_capable()))
    }
}
