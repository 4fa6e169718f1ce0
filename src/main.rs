//! brief-relay binary entrypoint.
//! Loads configuration, starts the feed/process/publish timers and serves the
//! inbound chat event endpoint.

use std::sync::Arc;

use anyhow::Context;
use brief_relay::api::{self, AppState};
use brief_relay::backend::{Backend, HttpBackend};
use brief_relay::chat::{ChatGateway, DiscordGateway};
use brief_relay::config::{load_verticals_default, Settings};
use brief_relay::feed::{FeedPoller, HttpFeedFetcher};
use brief_relay::notify::{Notifier, OpsLog};
use brief_relay::{scheduler, telemetry, IntakeHandler, Publisher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    // Missing configuration is the only fatal condition.
    let settings = Settings::from_env().context("loading settings")?;
    let verticals = load_verticals_default().context("loading verticals")?;
    let prometheus = telemetry::install_metrics()?;

    let http = settings.http_client()?;
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(
        http.clone(),
        &settings.backend_url,
        &settings.backend_secret,
        &settings.process_url,
    ));
    let mut discord = DiscordGateway::new(http.clone(), settings.discord_token.clone());
    if let Some(base) = settings.discord_api_base.as_deref() {
        discord = discord.with_api_base(base);
    }
    let chat: Arc<dyn ChatGateway> = Arc::new(discord);
    let notifier: Arc<dyn Notifier> = Arc::new(OpsLog::new(chat.clone(), settings.ops_channel.clone()));

    let poller = Arc::new(FeedPoller::new(
        backend.clone(),
        Arc::new(HttpFeedFetcher::new(http)),
        notifier.clone(),
        settings.feed.clone(),
    ));
    let publisher = Arc::new(Publisher::new(
        backend.clone(),
        chat.clone(),
        notifier.clone(),
        verticals.clone(),
        settings.publish.clone(),
    ));
    let intake = Arc::new(IntakeHandler::new(
        backend.clone(),
        chat,
        notifier.clone(),
        &verticals,
    ));

    let _timers = scheduler::spawn_all(poller, publisher, backend, notifier.clone(), settings.schedule);

    let names: Vec<_> = verticals.iter().map(|v| v.name.as_str()).collect();
    tracing::info!(verticals = ?names, bind = %settings.bind_addr, "brief-relay started");
    notifier
        .notify(&format!("brief-relay started (verticals: {})", names.join(", ")))
        .await;

    let app = api::router(AppState {
        intake,
        secret: Arc::from(settings.backend_secret.as_str()),
        metrics: Some(prometheus),
    });
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("binding {}", settings.bind_addr))?;
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
