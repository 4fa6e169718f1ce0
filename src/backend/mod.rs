// src/backend/mod.rs
pub mod http;
pub mod types;

pub use http::HttpBackend;
pub use types::*;

use crate::error::RelayResult;

/// The research backend: ingestion, feed source store, brief queue and the
/// processing trigger. It owns all persistent state.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Submit one candidate link.
    async fn ingest(&self, req: &IngestRequest) -> RelayResult<IngestOutcome>;

    async fn list_sources(&self, limit: usize) -> RelayResult<Vec<FeedSource>>;

    /// Subset of `keys` already recorded for the source.
    async fn seen_keys(&self, source_id: &SourceId, keys: &[String]) -> RelayResult<Vec<String>>;

    async fn report_poll(&self, report: &PollReport) -> RelayResult<()>;

    async fn unposted(&self, vertical: &str, limit: usize) -> RelayResult<Vec<PublishableItem>>;

    /// Returns the number of rows the backend updated.
    async fn mark_posted(&self, ids: &[i64]) -> RelayResult<u64>;

    async fn trigger_processing(&self, limit: usize) -> RelayResult<ProcessSummary>;
}
