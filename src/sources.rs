//! # Source Registry
//!
//! Per-entity, insertion-ordered list of feed identifiers.
//!
//! - Urls are trimmed before storage; empty values and exact duplicates are rejected.
//! - An entity becomes known through `register`, `seed`, or its first successful `add`.
//! - Reads of an unknown entity fail with `NotFound`; a known entity may have zero sources.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, info};

use crate::error::{Result, ServiceError, ValidationError};

#[derive(Debug, Default)]
pub struct SourceRegistry {
    inner: RwLock<HashMap<String, Vec<String>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicitly register an entity. Returns `true` if it was not known before.
    pub fn register(&self, entity_id: &str) -> bool {
        let mut map = self.inner.write().expect("source registry poisoned");
        if map.contains_key(entity_id) {
            return false;
        }
        map.insert(entity_id.to_string(), Vec::new());
        debug!(entity = entity_id, "entity registered");
        true
    }

    pub fn is_registered(&self, entity_id: &str) -> bool {
        self.inner
            .read()
            .expect("source registry poisoned")
            .contains_key(entity_id)
    }

    /// Current source list in insertion order.
    pub fn list(&self, entity_id: &str) -> Result<Vec<String>> {
        self.inner
            .read()
            .expect("source registry poisoned")
            .get(entity_id)
            .cloned()
            .ok_or_else(|| ServiceError::entity_not_found(entity_id))
    }

    /// Trim and append a source, creating the entity if needed.
    pub fn add(&self, entity_id: &str, raw_url: &str) -> Result<Vec<String>> {
        let url = raw_url.trim();
        if url.is_empty() {
            return Err(ValidationError::Empty.into());
        }

        let mut map = self.inner.write().expect("source registry poisoned");
        let list = map.entry(entity_id.to_string()).or_default();
        if list.iter().any(|s| s == url) {
            return Err(ValidationError::Duplicate.into());
        }
        list.push(url.to_string());
        debug!(entity = entity_id, source = url, total = list.len(), "source added");
        Ok(list.clone())
    }

    /// Bulk insert used once at start-up. Invalid and repeated entries are skipped.
    /// Returns how many sources were actually added.
    pub fn seed<I, S>(&self, entity_id: &str, sources: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.register(entity_id);
        let added = sources
            .into_iter()
            .filter(|s| self.add(entity_id, s.as_ref()).is_ok())
            .count();
        info!(entity = entity_id, added, "seeded sources");
        added
    }

    /// Known entity ids, sorted for stable iteration.
    pub fn entities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .read()
            .expect("source registry poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
