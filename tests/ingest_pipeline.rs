// tests/ingest_pipeline.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use feed_sentiment_tracker::ingest::providers::{StaticFeed, StaticFeedFetcher};
use feed_sentiment_tracker::ingest::types::{FeedEntry, FeedFetcher};
use feed_sentiment_tracker::ingest::{IngestOptions, IngestionPipeline};
use feed_sentiment_tracker::sources::SourceRegistry;
use feed_sentiment_tracker::store::ArticleStore;

/// Tracks how many fetches are in flight at once.
#[derive(Default)]
struct GaugedFetcher {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl FeedFetcher for GaugedFetcher {
    async fn fetch_feed(&self, source: &str) -> Result<Vec<FeedEntry>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![FeedEntry::titled(source)])
    }
    fn name(&self) -> &'static str {
        "gauged"
    }
}

fn setup(
    fetcher: Arc<dyn FeedFetcher>,
    opts: IngestOptions,
) -> (Arc<SourceRegistry>, Arc<ArticleStore>, Arc<IngestionPipeline>) {
    let reg = Arc::new(SourceRegistry::new());
    let store = Arc::new(ArticleStore::new());
    let p = IngestionPipeline::new(reg.clone(), store.clone(), fetcher, opts);
    (reg, store, Arc::new(p))
}

#[tokio::test(start_paused = true)]
async fn concurrency_never_exceeds_the_bound() {
    let fetcher = Arc::new(GaugedFetcher::default());
    let opts = IngestOptions {
        max_concurrent_fetches: 3,
        ..IngestOptions::default()
    };
    let (reg, store, p) = setup(fetcher.clone(), opts);
    for i in 0..10 {
        reg.add("s1", &format!("https://feed{i}.example/rss")).unwrap();
    }

    let rep = p.fetch("s1").await.unwrap();
    assert_eq!(rep.fetched, 10);
    assert_eq!(fetcher.peak.load(Ordering::SeqCst), 3);

    let titles: Vec<String> = store
        .get("s1")
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.title)
        .collect();
    let expected: Vec<String> = (0..10).map(|i| format!("https://feed{i}.example/rss")).collect();
    assert_eq!(titles, expected);
}

#[tokio::test(start_paused = true)]
async fn readers_wait_for_a_running_fetch() {
    let fetcher = Arc::new(StaticFeedFetcher::new().with(
        "slow",
        StaticFeed::Delayed(Duration::from_secs(2), vec![FeedEntry::titled("fresh")]),
    ));
    let (reg, store, p) = setup(fetcher, IngestOptions::default());
    reg.add("s1", "slow").unwrap();

    let runner = {
        let p = p.clone();
        tokio::spawn(async move { p.fetch("s1").await })
    };
    // Let the run take the slot lock before reading.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let seen = store.get("s1").await.unwrap();
    assert_eq!(seen.len(), 1, "reader must see the completed run only");
    assert_eq!(seen[0].title, "fresh");
    assert_eq!(runner.await.unwrap().unwrap().fetched, 1);
}

#[tokio::test(start_paused = true)]
async fn other_entities_are_not_blocked_by_a_slow_run() {
    let fetcher = Arc::new(
        StaticFeedFetcher::new()
            .with("slow", StaticFeed::Hang)
            .with("fast", StaticFeed::single("quick")),
    );
    let opts = IngestOptions {
        fetch_timeout: Duration::from_secs(30),
        ..IngestOptions::default()
    };
    let (reg, store, p) = setup(fetcher, opts);
    reg.add("a", "slow").unwrap();
    reg.add("b", "fast").unwrap();

    let stuck = {
        let p = p.clone();
        tokio::spawn(async move { p.fetch("a").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let rep = tokio::time::timeout(Duration::from_secs(1), p.fetch("b"))
        .await
        .expect("entity b must not wait on entity a")
        .unwrap();
    assert_eq!(rep.fetched, 1);
    assert_eq!(store.get("b").await.unwrap()[0].title, "quick");

    let rep_a = stuck.await.unwrap().unwrap();
    assert_eq!(rep_a.failed_sources, 1);
    assert!(rep_a.failures[0].reason.contains("timed out"));
}
