//! Headline sentiment: scorer capability plus the three-way labeling rule.

pub mod vader;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use vader::VaderScorer;

/// Compound scores at or above this are positive.
pub const POSITIVE_THRESHOLD: f64 = 0.05;
/// Compound scores at or below this are negative.
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

/// Lexicon polarity breakdown. `neg + neu + pos` is ~1.0, `compound` is in [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Label a compound score. Both thresholds are inclusive.
    pub fn from_compound(compound: f64) -> Self {
        if compound >= POSITIVE_THRESHOLD {
            Sentiment::Positive
        } else if compound <= NEGATIVE_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> Scores;
}

pub type DynScorer = Arc<dyn SentimentScorer>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub scores: Scores,
}

/// Stateless wrapper pairing a scorer with the labeling rule.
#[derive(Clone)]
pub struct SentimentClassifier {
    scorer: DynScorer,
}

impl SentimentClassifier {
    pub fn new(scorer: DynScorer) -> Self {
        Self { scorer }
    }

    pub fn classify(&self, text: &str) -> Classification {
        let scores = self.scorer.score(text);
        Classification {
            sentiment: Sentiment::from_compound(scores.compound),
            scores,
        }
    }
}

impl Default for SentimentClassifier {
    fn default() -> Self {
        Self::new(Arc::new(VaderScorer::new()))
    }
}
