// src/scheduler.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::backend::Backend;
use crate::config::ScheduleSettings;
use crate::feed::FeedPoller;
use crate::notify::Notifier;
use crate::publish::Publisher;

/// First feed poll after startup; processing and publishing start later.
pub const FEED_INITIAL_DELAY: Duration = Duration::from_secs(15);
/// Gap between the first processing trigger and the first publish.
pub const PUBLISH_STAGGER: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialDelays {
    pub feed: Duration,
    pub process: Duration,
    pub publish: Duration,
}

/// Feed < processing < publish, with processing configurable.
pub fn initial_delays(schedule: &ScheduleSettings) -> InitialDelays {
    let process = schedule.process_initial_delay.max(FEED_INITIAL_DELAY + Duration::from_secs(1));
    InitialDelays {
        feed: FEED_INITIAL_DELAY,
        process,
        publish: process + PUBLISH_STAGGER,
    }
}

/// Spawn the three independent timers.
pub fn spawn_all(
    poller: Arc<FeedPoller>,
    publisher: Arc<Publisher>,
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    schedule: ScheduleSettings,
) -> Vec<JoinHandle<()>> {
    let delays = initial_delays(&schedule);
    tracing::info!(
        target: "scheduler",
        feed_every = schedule.feed_interval.as_secs(),
        process_every = schedule.process_interval.as_secs(),
        publish_every = schedule.publish_interval.as_secs(),
        "scheduler starting"
    );

    let feed = spawn_periodic("feed", delays.feed, schedule.feed_interval, move || {
        let poller = poller.clone();
        async move {
            poller.poll_all().await;
        }
    });

    let process_limit = schedule.process_limit;
    let process = spawn_periodic("process", delays.process, schedule.process_interval, move || {
        let backend = backend.clone();
        let notifier = notifier.clone();
        async move {
            run_processing(backend.as_ref(), notifier.as_ref(), process_limit).await;
        }
    });

    let publish = spawn_periodic("publish", delays.publish, schedule.publish_interval, move || {
        let publisher = publisher.clone();
        async move {
            publisher.publish_all().await;
        }
    });

    vec![feed, process, publish]
}

/// Sleep `initial`, then fire every `every`. Each run is its own task, so a
/// slow run overlaps the next tick and the job's guard decides.
pub fn spawn_periodic<F, Fut>(name: &'static str, initial: Duration, every: Duration, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(initial).await;
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            tracing::debug!(target: "scheduler", job = name, "tick");
            tokio::spawn(job());
        }
    })
}

/// Ask the backend to process queued items. Never fails.
pub async fn run_processing(backend: &dyn Backend, notifier: &dyn Notifier, limit: usize) {
    match backend.trigger_processing(limit).await {
        Ok(s) if s.processed > 0 || s.picked > 0 => {
            notifier
                .notify(&format!("process: picked={} processed={}", s.picked, s.processed))
                .await;
        }
        Ok(_) => tracing::debug!(target: "scheduler", "process: nothing to do"),
        Err(e) => {
            tracing::warn!(target: "scheduler", error = %e, "process trigger failed");
            notifier.notify(&format!("process trigger failed: {e}")).await;
        }
    }
}
