// src/ingest/types.rs
use anyhow::Result;

/// One raw entry as returned by a feed collaborator. Any field may be missing.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>, // as published upstream, not reparsed
}

impl FeedEntry {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }
}

/// Stored article. Missing upstream fields become empty strings.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub published: String,
}

impl From<FeedEntry> for Article {
    fn from(e: FeedEntry) -> Self {
        Self {
            title: e.title.unwrap_or_default(),
            link: e.link.unwrap_or_default(),
            published: e.published.unwrap_or_default(),
        }
    }
}

#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Pull every entry currently published at `source`.
    async fn fetch_feed(&self, source: &str) -> Result<Vec<FeedEntry>>;
    fn name(&self) -> &'static str;
}
