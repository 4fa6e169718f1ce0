// src/telemetry.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "brief_relay=info,ops=info,warn";

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines;
/// `RUST_LOG` overrides the filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if let Err(e) = res {
        eprintln!("tracing already initialized: {e}");
    }
}

/// Install the Prometheus recorder and describe the relay's series.
pub fn install_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;
    describe_metrics();
    Ok(handle)
}

/// One-time metrics registration (so series show up on /metrics).
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_sources_polled_total", Unit::Count, "Feed sources polled.");
        describe_counter!("feed_source_errors_total", Unit::Count, "Feed polls that failed.");
        describe_counter!("feed_items_ingested_total", Unit::Count, "Feed entries inserted by the backend.");
        describe_counter!("feed_items_skipped_total", Unit::Count, "Feed entries the backend already had.");
        describe_counter!("feed_item_errors_total", Unit::Count, "Feed entries whose ingestion failed.");
        describe_counter!("publish_posts_total", Unit::Count, "Brief items posted to output channels.");
        describe_counter!("publish_escalations_total", Unit::Count, "Brief items escalated to triage.");
        describe_counter!("publish_failures_total", Unit::Count, "Publish cycles that failed.");
        describe_counter!("intake_links_total", Unit::Count, "Chat links submitted, by outcome.");
    });
}
