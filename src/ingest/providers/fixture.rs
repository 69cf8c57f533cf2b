//! In-memory feed fetcher keyed by source string.
//!
//! Offline stand-in for `HttpRssFetcher` and the pipeline's test double.
//! XML fixtures go through the same parser as live HTTP feeds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::ingest::providers::http_rss::parse_feed;
use crate::ingest::types::{FeedEntry, FeedFetcher};

#[derive(Debug, Clone)]
pub enum StaticFeed {
    Entries(Vec<FeedEntry>),
    /// Raw RSS/Atom document.
    Xml(String),
    Fail(String),
    Delayed(Duration, Vec<FeedEntry>),
    /// Never resolves; only the pipeline timeout ends it.
    Hang,
}

impl StaticFeed {
    pub fn single(title: &str) -> Self {
        Self::titles(&[title])
    }

    pub fn titles(titles: &[&str]) -> Self {
        Self::Entries(titles.iter().map(|t| FeedEntry::titled(t)).collect())
    }
}

#[derive(Debug, Default)]
pub struct StaticFeedFetcher {
    feeds: RwLock<HashMap<String, StaticFeed>>,
    calls: AtomicUsize,
}

impl StaticFeedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, source: &str, feed: StaticFeed) -> Self {
        self.set(source, feed);
        self
    }

    /// Replace what `source` returns from now on.
    pub fn set(&self, source: &str, feed: StaticFeed) {
        self.feeds
            .write()
            .expect("static feeds poisoned")
            .insert(source.to_string(), feed);
    }

    /// Number of `fetch_feed` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedFetcher for StaticFeedFetcher {
    async fn fetch_feed(&self, source: &str) -> Result<Vec<FeedEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let feed = self
            .feeds
            .read()
            .expect("static feeds poisoned")
            .get(source)
            .cloned();

        match feed {
            Some(StaticFeed::Entries(v)) => Ok(v),
            Some(StaticFeed::Xml(xml)) => parse_feed(&xml),
            Some(StaticFeed::Fail(msg)) => Err(anyhow!(msg)),
            Some(StaticFeed::Delayed(d, v)) => {
                tokio::time::sleep(d).await;
                Ok(v)
            }
            Some(StaticFeed::Hang) => std::future::pending().await,
            None => Err(anyhow!("no fixture registered for {source}")),
        }
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
