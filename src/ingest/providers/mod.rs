// src/ingest/providers/mod.rs
pub mod fixture;
pub mod http_rss;

pub use fixture::{StaticFeed, StaticFeedFetcher};
pub use http_rss::{parse_feed, HttpRssFetcher};
