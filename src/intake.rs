// src/intake.rs
//! Links pasted into registered chat channels go straight to ingestion.

use anyhow::Result;
use chrono::Utc;
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{Backend, IngestRequest, IntakeOrigin};
use crate::chat::{ChatGateway, ChatMessage};
use crate::config::VerticalConfig;
use crate::links::extract_urls;
use crate::notify::Notifier;

pub const REACT_INSERTED: &str = "✅";
pub const REACT_DUPLICATE: &str = "♻️";
pub const REACT_WARNING: &str = "⚠️";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeReport {
    pub vertical: String,
    pub inserted: usize,
    pub duplicate: usize,
    /// `(url, error)` for every candidate the backend did not accept.
    pub failures: Vec<(String, String)>,
}

pub struct IntakeHandler {
    backend: Arc<dyn Backend>,
    chat: Arc<dyn ChatGateway>,
    notifier: Arc<dyn Notifier>,
    /// intake channel id -> vertical name
    channels: HashMap<String, String>,
}

impl IntakeHandler {
    pub fn new(
        backend: Arc<dyn Backend>,
        chat: Arc<dyn ChatGateway>,
        notifier: Arc<dyn Notifier>,
        verticals: &[VerticalConfig],
    ) -> Self {
        let channels = verticals
            .iter()
            .filter_map(|v| Some((v.intake_channel.clone()?, v.name.clone())))
            .collect();
        Self {
            backend,
            chat,
            notifier,
            channels,
        }
    }

    /// Entry point for gateway events. Never fails; errors go to the ops log.
    pub async fn on_message(&self, msg: &ChatMessage) {
        if let Err(e) = self.handle(msg).await {
            tracing::warn!(target: "intake", message_id = %msg.id, error = %format!("{e:#}"), "intake failed");
            self.notifier
                .notify(&format!("intake error on message {}: {e:#}", msg.id))
                .await;
        }
    }

    /// `None` when the message is not an intake candidate.
    pub async fn handle(&self, msg: &ChatMessage) -> Result<Option<IntakeReport>> {
        if msg.author.bot {
            return Ok(None);
        }
        let Some(vertical) = self.channels.get(&msg.channel_id) else {
            return Ok(None);
        };
        let urls = extract_urls(&msg.content);
        if urls.is_empty() {
            return Ok(None);
        }

        let mut report = IntakeReport {
            vertical: vertical.clone(),
            ..Default::default()
        };
        for url in urls {
            let req = IngestRequest {
                url: url.clone(),
                vertical: vertical.clone(),
                source: IntakeOrigin::Discord,
                source_channel_id: Some(msg.channel_id.clone()),
                source_message_id: Some(msg.id.clone()),
                author_id: Some(msg.author.id.clone()),
                author_username: Some(msg.author.username.clone()),
                metadata: None,
                posted_at: msg.timestamp.unwrap_or_else(Utc::now),
            };
            match self.backend.ingest(&req).await {
                Ok(o) if o.inserted => {
                    report.inserted += 1;
                    counter!("intake_links_total", "outcome" => "inserted").increment(1);
                }
                Ok(_) => {
                    report.duplicate += 1;
                    counter!("intake_links_total", "outcome" => "duplicate").increment(1);
                }
                Err(e) => {
                    counter!("intake_links_total", "outcome" => "failed").increment(1);
                    report.failures.push((url, e.to_string()));
                }
            }
        }

        let counts = format!(
            "intake {}: inserted={} duplicate={}",
            report.vertical, report.inserted, report.duplicate
        );
        // Status line goes out before reacting so a rejected reaction
        // cannot swallow the failure details.
        if report.failures.is_empty() {
            self.notifier
                .notify(&format!("{counts} (by {})", msg.author.username))
                .await;
            if report.inserted > 0 {
                self.chat.react(&msg.channel_id, &msg.id, REACT_INSERTED).await?;
            }
            if report.duplicate > 0 {
                self.chat.react(&msg.channel_id, &msg.id, REACT_DUPLICATE).await?;
            }
        } else {
            let failed: Vec<String> = report
                .failures
                .iter()
                .map(|(url, err)| format!("- {url}: {err}"))
                .collect();
            self.notifier
                .notify(&format!(
                    "{counts} failed={} (by {})\n{}",
                    report.failures.len(),
                    msg.author.username,
                    failed.join("\n")
                ))
                .await;
            self.chat.react(&msg.channel_id, &msg.id, REACT_WARNING).await?;
        }
        Ok(Some(report))
    }
}
