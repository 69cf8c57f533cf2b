// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ServiceError, SourceFetchError};
use crate::ingest::types::{Article, FeedEntry, FeedFetcher};
use crate::sources::SourceRegistry;
use crate::store::ArticleStore;

pub type DynFetcher = Arc<dyn FeedFetcher>;

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Ingestion runs started.");
        describe_counter!(
            "ingest_articles_total",
            "Articles stored across all ingestion runs."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Sources that failed to fetch or parse."
        );
        describe_counter!(
            "ingest_source_timeouts_total",
            "Sources abandoned after the per-source timeout."
        );
        describe_histogram!("ingest_fetch_ms", "Whole-run fetch time in milliseconds.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when an ingestion run last finished.");
        describe_counter!("ingest_entries_parsed_total", "Feed entries parsed from XML.");
        describe_counter!("ingest_scheduler_ticks_total", "Background refresh ticks.");
        describe_counter!("analyze_articles_total", "Articles classified by /analyze.");
    });
}

#[derive(Clone, Copy, Debug)]
pub struct IngestOptions {
    pub max_concurrent_fetches: usize,
    pub fetch_timeout: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub reason: String,
}

/// Outcome of one ingestion run for one entity.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FetchReport {
    pub fetched: usize,
    pub failed_sources: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SourceFailure>,
}

/// Sole writer of the article store: sources in, articles out.
pub struct IngestionPipeline {
    registry: Arc<SourceRegistry>,
    store: Arc<ArticleStore>,
    fetcher: DynFetcher,
    opts: IngestOptions,
}

impl IngestionPipeline {
    pub fn new(
        registry: Arc<SourceRegistry>,
        store: Arc<ArticleStore>,
        fetcher: DynFetcher,
        opts: IngestOptions,
    ) -> Self {
        let opts = IngestOptions {
            max_concurrent_fetches: opts.max_concurrent_fetches.max(1),
            fetch_timeout: opts.fetch_timeout.max(Duration::from_millis(1)),
        };
        Self {
            registry,
            store,
            fetcher,
            opts,
        }
    }

    pub fn options(&self) -> IngestOptions {
        self.opts
    }

    pub fn fetcher_name(&self) -> &'static str {
        self.fetcher.name()
    }

    /// Rebuild the article list of `entity_id` from its sources.
    ///
    /// The entity's slot stays locked for the whole run and is cleared before the first
    /// fetch, so an interrupted run leaves an empty list rather than a mix of runs.
    /// Sources are fetched with bounded concurrency; results are appended in source order.
    pub async fn fetch(&self, entity_id: &str) -> Result<FetchReport> {
        ensure_metrics_described();
        if !self.registry.is_registered(entity_id) {
            return Err(ServiceError::entity_not_found(entity_id));
        }

        let mut articles = self.store.lock_or_create(entity_id).await;
        articles.clear();
        let sources = self.registry.list(entity_id)?;
        counter!("ingest_runs_total").increment(1);

        let t0 = Instant::now();
        let mut report = FetchReport::default();
        let mut outcomes = stream::iter(sources)
            .map(|source| async move {
                let outcome = self.fetch_one(&source).await;
                (source, outcome)
            })
            .buffered(self.opts.max_concurrent_fetches);

        while let Some((source, outcome)) = outcomes.next().await {
            match outcome {
                Ok(entries) => {
                    debug!(
                        entity = entity_id,
                        source = %source,
                        fetcher = self.fetcher.name(),
                        entries = entries.len(),
                        "source fetched"
                    );
                    report.fetched += entries.len();
                    articles.extend(entries.into_iter().map(Article::from));
                }
                Err(e) => {
                    let reason = format!("{e:#}");
                    warn!(
                        entity = entity_id,
                        source = %source,
                        fetcher = self.fetcher.name(),
                        error = %reason,
                        "source failed"
                    );
                    counter!("ingest_source_errors_total").increment(1);
                    if matches!(e, SourceFetchError::Timeout(_)) {
                        counter!("ingest_source_timeouts_total").increment(1);
                    }
                    report.failed_sources += 1;
                    report.failures.push(SourceFailure { source, reason });
                }
            }
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_fetch_ms").record(ms);
        counter!("ingest_articles_total").increment(report.fetched as u64);
        gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        info!(
            target: "ingest",
            entity = entity_id,
            fetched = report.fetched,
            failed = report.failed_sources,
            elapsed_ms = ms as u64,
            "ingestion run finished"
        );
        Ok(report)
    }

    /// Run `fetch` for every known entity, one entity at a time.
    pub async fn fetch_all(&self) -> Vec<(String, Result<FetchReport>)> {
        let mut out = Vec::new();
        for entity in self.registry.entities() {
            let res = self.fetch(&entity).await;
            out.push((entity, res));
        }
        out
    }

    async fn fetch_one(
        &self,
        source: &str,
    ) -> std::result::Result<Vec<FeedEntry>, SourceFetchError> {
        let fut = self.fetcher.fetch_feed(source);
        match tokio::time::timeout(self.opts.fetch_timeout, fut).await {
            Ok(Ok(entries)) => Ok(entries),
            Ok(Err(e)) => Err(SourceFetchError::Failed(e)),
            Err(_) => Err(SourceFetchError::Timeout(self.opts.fetch_timeout)),
        }
    }
}

pub const MAX_TEXT_CHARS: usize = 1000;

/// Normalize raw feed text: decode HTML entities, then `clean_text`.
pub fn normalize_text(s: &str) -> String {
    clean_text(&html_escape::decode_html_entities(s))
}

/// Clean text the XML parser has already unescaped: drop markup, straighten quotes,
/// collapse whitespace, cap length. Entities are left alone so escaped markup survives.
pub fn clean_text(s: &str) -> String {
    // 1) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags =
        RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[a-z][^>]*>").expect("tag regex"));
    let mut out = re_tags.replace_all(s, "").to_string();

    // 2) Normalize curly quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 3) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap
    let chars = out.chars().count();
    if chars > MAX_TEXT_CHARS {
        debug!(chars, cap = MAX_TEXT_CHARS, "truncating feed text");
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::providers::fixture::{StaticFeed, StaticFeedFetcher};

    fn pipeline(
        fetcher: StaticFeedFetcher,
        opts: IngestOptions,
    ) -> (Arc<SourceRegistry>, Arc<ArticleStore>, IngestionPipeline) {
        let reg = Arc::new(SourceRegistry::new());
        let store = Arc::new(ArticleStore::new());
        let p = IngestionPipeline::new(reg.clone(), store.clone(), Arc::new(fetcher), opts);
        (reg, store, p)
    }

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let out =
            normalize_text("  <b>Stocks&nbsp;&nbsp;rally</b>\n  on &ldquo;good&rdquo; news!  ");
        assert_eq!(out, r#"Stocks rally on "good" news!"#);
    }

    #[test]
    fn clean_text_keeps_escaped_markup_and_comparisons() {
        assert_eq!(clean_text("Use &lt;b&gt; tags & more"), "Use &lt;b&gt; tags & more");
        assert_eq!(clean_text("3 < 5 and <i>6</i> > 4"), "3 < 5 and 6 > 4");
    }

    #[test]
    fn clean_text_caps_length() {
        let long = "a".repeat(MAX_TEXT_CHARS + 200);
        assert_eq!(clean_text(&long).chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn fetcher_name_is_exposed() {
        let (_, _, p) = pipeline(StaticFeedFetcher::new(), IngestOptions::default());
        assert_eq!(p.fetcher_name(), "static");
    }

    #[tokio::test]
    async fn unknown_entity_is_not_found() {
        let (_, store, p) = pipeline(StaticFeedFetcher::new(), IngestOptions::default());
        assert!(matches!(p.fetch("ghost").await, Err(ServiceError::NotFound(_))));
        assert!(!store.contains("ghost"));
    }

    #[tokio::test]
    async fn entity_without_sources_yields_zero() {
        let (reg, store, p) = pipeline(StaticFeedFetcher::new(), IngestOptions::default());
        reg.register("s1");
        let rep = p.fetch("s1").await.unwrap();
        assert_eq!(rep, FetchReport::default());
        assert!(store.get("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_fields_default_to_empty_strings() {
        let f = StaticFeedFetcher::new().with(
            "u",
            StaticFeed::Entries(vec![FeedEntry {
                title: None,
                link: Some("http://a".into()),
                published: None,
            }]),
        );
        let (reg, store, p) = pipeline(f, IngestOptions::default());
        reg.add("s1", "u").unwrap();
        p.fetch("s1").await.unwrap();
        assert_eq!(
            store.get("s1").await.unwrap(),
            vec![Article {
                title: String::new(),
                link: "http://a".into(),
                published: String::new(),
            }]
        );
    }

    #[tokio::test]
    async fn order_follows_sources_even_with_concurrency() {
        let slow = vec![FeedEntry::titled("a1"), FeedEntry::titled("a2")];
        let f = StaticFeedFetcher::new()
            .with("slow", StaticFeed::Delayed(Duration::from_millis(80), slow))
            .with("fast", StaticFeed::Entries(vec![FeedEntry::titled("b1")]));
        let (reg, store, p) = pipeline(f, IngestOptions::default());
        reg.add("s1", "slow").unwrap();
        reg.add("s1", "fast").unwrap();

        assert_eq!(p.fetch("s1").await.unwrap().fetched, 3);
        let titles: Vec<String> = store
            .get("s1")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["a1", "a2", "b1"]);
    }

    #[tokio::test]
    async fn slow_source_times_out_without_sinking_the_run() {
        let f = StaticFeedFetcher::new()
            .with("hang", StaticFeed::Hang)
            .with("ok", StaticFeed::Entries(vec![FeedEntry::titled("fine")]));
        let opts = IngestOptions {
            max_concurrent_fetches: 2,
            fetch_timeout: Duration::from_millis(50),
        };
        let (reg, store, p) = pipeline(f, opts);
        reg.add("s1", "hang").unwrap();
        reg.add("s1", "ok").unwrap();

        let rep = p.fetch("s1").await.unwrap();
        assert_eq!(rep.fetched, 1);
        assert_eq!(rep.failed_sources, 1);
        assert_eq!(rep.failures[0].source, "hang");
        assert!(rep.failures[0].reason.contains("timed out"));
        assert_eq!(store.get("s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped() {
        let f = StaticFeedFetcher::new().with("u", StaticFeed::single("x"));
        let opts = IngestOptions {
            max_concurrent_fetches: 0,
            ..IngestOptions::default()
        };
        let (reg, _, p) = pipeline(f, opts);
        assert_eq!(p.options().max_concurrent_fetches, 1);
        reg.add("s1", "u").unwrap();
        assert_eq!(p.fetch("s1").await.unwrap().fetched, 1);
    }

    #[tokio::test]
    async fn fetch_all_covers_every_entity() {
        let f = StaticFeedFetcher::new().with("u", StaticFeed::single("x"));
        let (reg, _, p) = pipeline(f, IngestOptions::default());
        reg.add("a", "u").unwrap();
        reg.register("b");
        let res = p.fetch_all().await;
        let summary: Vec<(String, usize)> = res
            .into_iter()
            .map(|(e, r)| (e, r.unwrap().fetched))
            .collect();
        assert_eq!(summary, vec![("a".to_string(), 1), ("b".to_string(), 0)]);
    }
}
