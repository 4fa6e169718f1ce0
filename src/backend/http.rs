// src/backend/http.rs
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{
    Backend, FeedSource, IngestOutcome, IngestRequest, PollReport, ProcessSummary,
    PublishableItem, SourceId,
};
use crate::error::{RelayError, RelayResult};

/// Header carrying the shared secret on every backend call.
pub const SECRET_HEADER: &str = "x-relay-secret";

/// reqwest client for the backend JSON API.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    secret: String,
    process_url: String,
}

impl HttpBackend {
    pub fn new(client: Client, base_url: &str, secret: &str, process_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.to_string(),
            process_url: process_url.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send, fail on non-2xx with the (truncated) body, return the raw body.
    async fn send_raw(&self, req: RequestBuilder) -> RelayResult<String> {
        let resp = req.header(SECRET_HEADER, &self.secret).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(RelayError::status(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> RelayResult<T> {
        let body = self.send_raw(req).await?;
        serde_json::from_str(&body).map_err(|e| RelayError::Decode(format!("{e}")))
    }
}

#[derive(Deserialize)]
struct SourcesResp {
    #[serde(default)]
    sources: Vec<FeedSource>,
}

#[derive(Deserialize)]
struct SeenResp {
    #[serde(default)]
    seen: Vec<String>,
}

#[derive(Deserialize)]
struct UnpostedResp {
    #[serde(default)]
    items: Vec<PublishableItem>,
}

#[derive(Deserialize)]
struct MarkPostedResp {
    #[serde(default)]
    updated: u64,
}

#[async_trait]
impl Backend for HttpBackend {
    async fn ingest(&self, req: &IngestRequest) -> RelayResult<IngestOutcome> {
        let body = self
            .send_raw(self.client.post(self.endpoint("/api/ingest")).json(req))
            .await?;
        // A body that is not JSON still counts as accepted.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn list_sources(&self, limit: usize) -> RelayResult<Vec<FeedSource>> {
        let req = self
            .client
            .get(self.endpoint("/api/sources/rss"))
            .query(&[("limit", limit)]);
        let resp: SourcesResp = self.send_json(req).await?;
        Ok(resp.sources)
    }

    async fn seen_keys(&self, source_id: &SourceId, keys: &[String]) -> RelayResult<Vec<String>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let req = self
            .client
            .post(self.endpoint("/api/sources/rss/seen"))
            .json(&json!({ "source_id": source_id, "keys": keys }));
        let resp: SeenResp = self.send_json(req).await?;
        Ok(resp.seen)
    }

    async fn report_poll(&self, report: &PollReport) -> RelayResult<()> {
        self.send_raw(
            self.client
                .post(self.endpoint("/api/sources/rss/report"))
                .json(report),
        )
        .await?;
        Ok(())
    }

    async fn unposted(&self, vertical: &str, limit: usize) -> RelayResult<Vec<PublishableItem>> {
        let limit = limit.to_string();
        let req = self
            .client
            .get(self.endpoint("/api/brief/unposted"))
            .query(&[("vertical", vertical), ("limit", limit.as_str())]);
        let resp: UnpostedResp = self.send_json(req).await?;
        Ok(resp.items)
    }

    async fn mark_posted(&self, ids: &[i64]) -> RelayResult<u64> {
        let req = self
            .client
            .post(self.endpoint("/api/brief/mark-posted"))
            .json(&json!({ "ids": ids }));
        let resp: MarkPostedResp = self.send_json(req).await?;
        Ok(resp.updated)
    }

    async fn trigger_processing(&self, limit: usize) -> RelayResult<ProcessSummary> {
        let limit = limit.to_string();
        let req = self
            .client
            .get(&self.process_url)
            .query(&[("secret", self.secret.as_str()), ("limit", limit.as_str())]);
        self.send_json(req).await
    }
}
