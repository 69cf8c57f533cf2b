//! Feed Sentiment Tracker: binary entrypoint.
//! Loads config, builds the tracker, and serves the Axum router on Shuttle.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_sentiment_tracker::api::{create_router, AppState};
use feed_sentiment_tracker::config::AppConfig;
use feed_sentiment_tracker::ingest::scheduler::{spawn_refresh_scheduler, RefreshSchedulerCfg};
use feed_sentiment_tracker::metrics::Metrics;
use feed_sentiment_tracker::FeedTracker;

/// Crate events plus the `ingest` target used by run and refresh summaries.
const DEFAULT_LOG_FILTER: &str = "feed_sentiment_tracker=info,ingest=info,warn";

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - TRACKER_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("TRACKER_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // Shuttle may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = AppConfig::load().context("loading tracker config")?;
    let tracker = Arc::new(FeedTracker::from_config(&cfg)?);

    if let Some(interval) = cfg.refresh_interval() {
        tracing::info!(interval_secs = interval.as_secs(), "starting refresh scheduler");
        spawn_refresh_scheduler(RefreshSchedulerCfg { interval }, tracker.pipeline());
    }

    let metrics = Metrics::init()?;
    let state = AppState::new(tracker);
    let router = create_router(state, &cfg.cors.allowed_origins).merge(metrics.router());

    Ok(router.into())
}
