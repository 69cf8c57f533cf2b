//! `FeedTracker` wires registry, store, pipeline and analysis into one handle.
//!
//! Entity existence is decided here, uniformly: an entity is known once it is
//! registered, seeded, or given its first source, and each of those paths also
//! creates its (empty) article slot. Everything else answers `NotFound`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use tracing::info;

use crate::analysis::{AnalysisReport, AnalysisService};
use crate::config::AppConfig;
use crate::error::Result;
use crate::ingest::config::SourceSeed;
use crate::ingest::providers::HttpRssFetcher;
use crate::ingest::types::Article;
use crate::ingest::{DynFetcher, FetchReport, IngestOptions, IngestionPipeline};
use crate::sentiment::{DynScorer, SentimentClassifier, VaderScorer};
use crate::sources::SourceRegistry;
use crate::store::ArticleStore;

pub struct FeedTracker {
    registry: Arc<SourceRegistry>,
    store: Arc<ArticleStore>,
    pipeline: Arc<IngestionPipeline>,
    analysis: AnalysisService,
}

impl FeedTracker {
    pub fn new(fetcher: DynFetcher, scorer: DynScorer, opts: IngestOptions) -> Self {
        let registry = Arc::new(SourceRegistry::new());
        let store = Arc::new(ArticleStore::new());
        let pipeline = Arc::new(IngestionPipeline::new(
            registry.clone(),
            store.clone(),
            fetcher,
            opts,
        ));
        let analysis = AnalysisService::new(store.clone(), SentimentClassifier::new(scorer));
        Self {
            registry,
            store,
            pipeline,
            analysis,
        }
    }

    /// Build the production tracker: HTTP feed fetcher, VADER-style scorer, config seed.
    pub fn from_config(cfg: &AppConfig) -> AnyResult<Self> {
        let opts = cfg.ingest_options();
        let fetcher = HttpRssFetcher::new(&cfg.ingest.user_agent, opts.fetch_timeout)?;
        let scorer = match cfg.sentiment.lexicon_path.as_deref() {
            Some(p) => VaderScorer::from_path(Path::new(p))
                .with_context(|| format!("loading sentiment lexicon {p}"))?,
            None => VaderScorer::new(),
        };
        info!(
            lexicon_words = scorer.len(),
            max_concurrent_fetches = opts.max_concurrent_fetches,
            fetch_timeout_secs = opts.fetch_timeout.as_secs(),
            "feed tracker configured"
        );

        let tracker = Self::new(Arc::new(fetcher), Arc::new(scorer), opts);
        info!(fetcher = tracker.pipeline.fetcher_name(), "feed fetcher ready");
        if let Some(seed) = cfg.seed.as_ref() {
            tracker.seed(seed);
        }
        Ok(tracker)
    }

    /// Idempotent explicit registration. Returns `true` if the entity is new.
    pub fn register(&self, entity_id: &str) -> bool {
        let created = self.registry.register(entity_id);
        self.store.ensure(entity_id);
        created
    }

    pub fn seed(&self, seed: &SourceSeed) -> usize {
        let added = self.registry.seed(&seed.entity_id, &seed.sources);
        self.store.ensure(&seed.entity_id);
        added
    }

    pub fn list_sources(&self, entity_id: &str) -> Result<Vec<String>> {
        self.registry.list(entity_id)
    }

    pub fn add_source(&self, entity_id: &str, raw_url: &str) -> Result<Vec<String>> {
        let sources = self.registry.add(entity_id, raw_url)?;
        self.store.ensure(entity_id);
        Ok(sources)
    }

    pub async fn fetch(&self, entity_id: &str) -> Result<FetchReport> {
        self.pipeline.fetch(entity_id).await
    }

    pub async fn articles(&self, entity_id: &str) -> Result<Vec<Article>> {
        self.store.get(entity_id).await
    }

    pub async fn analyze(&self, entity_id: &str) -> Result<AnalysisReport> {
        self.analysis.analyze(entity_id).await
    }

    pub fn pipeline(&self) -> Arc<IngestionPipeline> {
        self.pipeline.clone()
    }

    pub fn entities(&self) -> Vec<String> {
        self.registry.entities()
    }
}
