// tests/metrics_ingest.rs
#![cfg(feature = "strict-metrics")]
use std::sync::Arc;

use feed_sentiment_tracker::ingest::providers::{StaticFeed, StaticFeedFetcher};
use feed_sentiment_tracker::ingest::IngestOptions;
use feed_sentiment_tracker::metrics::Metrics;
use feed_sentiment_tracker::sentiment::VaderScorer;
use feed_sentiment_tracker::FeedTracker;

#[tokio::test]
async fn metrics_exposed_after_ingest_and_analysis() {
    // Installs the global recorder; this must stay the only test in the binary.
    let metrics = Metrics::init().expect("recorder");

    let fetcher = StaticFeedFetcher::new()
        .with("good", StaticFeed::titles(&["I love this"]))
        .with("bad", StaticFeed::Fail("down".into()));
    let tracker = FeedTracker::new(
        Arc::new(fetcher),
        Arc::new(VaderScorer::new()),
        IngestOptions::default(),
    );
    tracker.add_source("s1", "good").unwrap();
    tracker.add_source("s1", "bad").unwrap();
    tracker.fetch("s1").await.unwrap();
    tracker.analyze("s1").await.unwrap();

    // Scrape metrics text and check series presence by substring
    let out = metrics.handle.render();
    assert!(out.contains("ingest_runs_total"));
    assert!(out.contains("ingest_articles_total"));
    assert!(out.contains("ingest_source_errors_total"));
    assert!(out.contains("ingest_fetch_ms"));
    assert!(out.contains("ingest_last_run_ts"));
    assert!(out.contains("analyze_articles_total"));
}
