// src/config/mod.rs
//! Runtime configuration: `config/tracker.toml` (or `$TRACKER_CONFIG_PATH`),
//! then env overrides, then sanitizing.
//!
//! ```toml
//! [ingest]
//! max_concurrent_fetches = 4
//! fetch_timeout_secs = 10
//! refresh_interval_secs = 0
//!
//! [cors]
//! allowed_origins = []
//!
//! [seed]
//! entity_id = "s1"
//! sources = ["https://example.org/rss"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use crate::ingest::config::{load_seed_default, SourceSeed};
use crate::ingest::providers::http_rss::DEFAULT_USER_AGENT;
use crate::ingest::{IngestOptions, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_CONCURRENT_FETCHES};

pub const DEFAULT_CONFIG_PATH: &str = "config/tracker.toml";
pub const ENV_CONFIG_PATH: &str = "TRACKER_CONFIG_PATH";

pub const ENV_MAX_CONCURRENCY: &str = "INGEST_MAX_CONCURRENCY";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "INGEST_FETCH_TIMEOUT_SECS";
pub const ENV_REFRESH_INTERVAL_SECS: &str = "INGEST_REFRESH_INTERVAL_SECS";
pub const ENV_LEXICON_PATH: &str = "SENTIMENT_LEXICON_PATH";

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}
fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT.as_secs()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// 0 disables the background refresh.
    #[serde(default)]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            refresh_interval_secs: 0,
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CorsConfig {
    /// Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SentimentConfig {
    /// JSON (`{"word": valence}`) or TSV lexicon replacing the embedded one.
    #[serde(default)]
    pub lexicon_path: Option<String>,
}

/// On-disk shape. `[seed]` stays raw so a malformed table is skipped, not fatal.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    ingest: IngestConfig,
    #[serde(default)]
    cors: CorsConfig,
    #[serde(default)]
    sentiment: SentimentConfig,
    #[serde(default)]
    seed: Option<toml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub cors: CorsConfig,
    pub sentiment: SentimentConfig,
    pub seed: Option<SourceSeed>,
}

impl AppConfig {
    /// Resolve the config path from env, falling back to `config/tracker.toml`.
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    /// Missing file means defaults; an unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let raw = if path.exists() {
            let data = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str::<RawConfig>(&data)
                .with_context(|| format!("parsing config {}", path.display()))?
        } else {
            RawConfig::default()
        };

        let seed = raw.seed.and_then(SourceSeed::from_toml_value);
        let mut cfg = Self {
            ingest: raw.ingest,
            cors: raw.cors,
            sentiment: raw.sentiment,
            seed,
        };
        cfg.apply_env();
        if cfg.seed.is_none() {
            cfg.seed = load_seed_default();
        }
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_parse::<usize>(ENV_MAX_CONCURRENCY) {
            self.ingest.max_concurrent_fetches = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_FETCH_TIMEOUT_SECS) {
            self.ingest.fetch_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_REFRESH_INTERVAL_SECS) {
            self.ingest.refresh_interval_secs = v;
        }
        if let Ok(p) = env::var(ENV_LEXICON_PATH) {
            self.sentiment.lexicon_path = Some(p);
        }
    }

    fn sanitize(&mut self) {
        if self.ingest.max_concurrent_fetches == 0 {
            self.ingest.max_concurrent_fetches = 1;
        }
        if self.ingest.fetch_timeout_secs == 0 {
            self.ingest.fetch_timeout_secs = 1;
        }
        if self.ingest.user_agent.trim().is_empty() {
            self.ingest.user_agent = default_user_agent();
        }
        self.sentiment.lexicon_path = self
            .sentiment
            .lexicon_path
            .take()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self.cors.allowed_origins.retain(|o| !o.trim().is_empty());
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            max_concurrent_fetches: self.ingest.max_concurrent_fetches,
            fetch_timeout: Duration::from_secs(self.ingest.fetch_timeout_secs),
        }
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.ingest.refresh_interval_secs {
            0 => None,
            s => Some(Duration::from_secs(s)),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}
