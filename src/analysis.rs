//! Read-only sentiment projection over stored articles.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;

use crate::error::Result;
use crate::ingest::types::Article;
use crate::sentiment::{Scores, Sentiment, SentimentClassifier};
use crate::store::ArticleStore;

/// An article with its headline classification. Never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SentimentResult {
    #[serde(flatten)]
    pub article: Article,
    pub sentiment: Sentiment,
    pub scores: Scores,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalysisReport {
    pub analyzed: usize,
    pub articles: Vec<SentimentResult>,
}

pub struct AnalysisService {
    store: Arc<ArticleStore>,
    classifier: SentimentClassifier,
}

impl AnalysisService {
    pub fn new(store: Arc<ArticleStore>, classifier: SentimentClassifier) -> Self {
        Self { store, classifier }
    }

    /// Classify every stored title of `entity_id`, in stored order.
    /// Holds the entity's slot so an in-flight ingestion is never observed half-done.
    pub async fn analyze(&self, entity_id: &str) -> Result<AnalysisReport> {
        let guard = self.store.lock(entity_id).await?;
        let articles: Vec<SentimentResult> = guard
            .iter()
            .map(|a| {
                let c = self.classifier.classify(&a.title);
                SentimentResult {
                    article: a.clone(),
                    sentiment: c.sentiment,
                    scores: c.scores,
                }
            })
            .collect();
        drop(guard);

        counter!("analyze_articles_total").increment(articles.len() as u64);
        tracing::debug!(entity = entity_id, analyzed = articles.len(), "analysis done");
        Ok(AnalysisReport {
            analyzed: articles.len(),
            articles,
        })
    }
}
