// src/ingest/config.rs
//! Start-up seed: one entity and its initial source list.
//!
//! Accepted shapes (TOML or JSON), either bare or under a `seed` key:
//! ```toml
//! entity_id = "student-42"
//! sources = ["https://example.org/rss"]
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const ENV_SEED_PATH: &str = "TRACKER_SEED_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceSeed {
    pub entity_id: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Deserialize)]
struct Wrapped {
    seed: SourceSeed,
}

impl SourceSeed {
    /// Trim the entity id, drop blank and repeated sources (first occurrence wins).
    /// Returns `None` when no usable entity id remains.
    pub fn sanitized(self) -> Option<Self> {
        let entity_id = self.entity_id.trim().to_string();
        if entity_id.is_empty() {
            return None;
        }
        Some(Self {
            entity_id,
            sources: clean_list(self.sources),
        })
    }

    /// Interpret an already-parsed `[seed]` table. Malformed tables yield `None`.
    pub fn from_toml_value(v: toml::Value) -> Option<Self> {
        match v.try_into::<SourceSeed>() {
            Ok(seed) => seed.sanitized(),
            Err(e) => {
                warn!(error = %e, "ignoring malformed [seed] section");
                None
            }
        }
    }
}

/// Load a seed from an explicit path. Supports TOML or JSON formats.
pub fn load_seed_from(path: &Path) -> Result<SourceSeed> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading seed from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_seed(&content, ext.as_str())?
        .sanitized()
        .ok_or_else(|| anyhow!("seed in {} has an empty entity_id", path.display()))
}

/// Resolve the seed file using env var + fallbacks:
/// 1) $TRACKER_SEED_PATH
/// 2) config/seed.toml
/// 3) config/seed.json
///
/// Absent or malformed seeds are skipped (`None`), never fatal.
pub fn load_seed_default() -> Option<SourceSeed> {
    let candidates: Vec<PathBuf> = match std::env::var(ENV_SEED_PATH) {
        Ok(p) => vec![PathBuf::from(p)],
        Err(_) => vec![
            PathBuf::from("config/seed.toml"),
            PathBuf::from("config/seed.json"),
        ],
    };
    let path = candidates.into_iter().find(|p| p.exists())?;
    match load_seed_from(&path) {
        Ok(seed) => Some(seed),
        Err(e) => {
            let reason = format!("{e:#}");
            warn!(path = %path.display(), error = %reason, "ignoring malformed seed file");
            None
        }
    }
}

fn parse_seed(s: &str, hint_ext: &str) -> Result<SourceSeed> {
    let try_toml = hint_ext == "toml" || !s.trim_start().starts_with('{');
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported seed format"))
}

fn parse_toml(s: &str) -> Result<SourceSeed> {
    if let Ok(w) = toml::from_str::<Wrapped>(s) {
        return Ok(w.seed);
    }
    Ok(toml::from_str::<SourceSeed>(s)?)
}

fn parse_json(s: &str) -> Result<SourceSeed> {
    if let Ok(w) = serde_json::from_str::<Wrapped>(s) {
        return Ok(w.seed);
    }
    Ok(serde_json::from_str::<SourceSeed>(s)?)
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_dedup_and_formats_work() {
        let toml = r#"
entity_id = " s1 "
sources = [" https://b/rss ", "", "https://a/rss", "https://b/rss"]
"#;
        let json = r#"{"seed": {"entity_id": "s2", "sources": ["https://x/rss", "  "]}}"#;

        let t = parse_seed(toml, "toml").unwrap().sanitized().unwrap();
        assert_eq!(t.entity_id, "s1");
        assert_eq!(t.sources, vec!["https://b/rss".to_string(), "https://a/rss".to_string()]);

        let j = parse_seed(json, "json").unwrap().sanitized().unwrap();
        assert_eq!(j.entity_id, "s2");
        assert_eq!(j.sources, vec!["https://x/rss".to_string()]);
    }

    #[test]
    fn blank_entity_is_rejected() {
        let seed = SourceSeed {
            entity_id: "  ".into(),
            sources: vec!["https://a/rss".into()],
        };
        assert!(seed.sanitized().is_none());
    }

    #[test]
    fn malformed_table_is_skipped() {
        let t: toml::Table = toml::from_str("sources = 3").unwrap();
        assert!(SourceSeed::from_toml_value(toml::Value::Table(t)).is_none());
    }

    #[test]
    fn unsupported_content_errors() {
        assert!(parse_seed("just words", "txt").is_err());
    }
}
