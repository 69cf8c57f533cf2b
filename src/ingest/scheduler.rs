// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::ingest::IngestionPipeline;

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval: Duration,
}

/// Spawn a background task that re-ingests every known entity on each tick.
/// The first tick fires immediately.
pub fn spawn_refresh_scheduler(
    cfg: RefreshSchedulerCfg,
    pipeline: Arc<IngestionPipeline>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            counter!("ingest_scheduler_ticks_total").increment(1);

            for (entity, res) in pipeline.fetch_all().await {
                match res {
                    Ok(report) => tracing::info!(
                        target: "ingest",
                        entity = %entity,
                        fetched = report.fetched,
                        failed = report.failed_sources,
                        "scheduled refresh"
                    ),
                    Err(e) => tracing::warn!(
                        target: "ingest",
                        entity = %entity,
                        error = %e,
                        "scheduled refresh failed"
                    ),
                }
            }
        }
    })
}
