//! # Article Store
//! Per-entity article snapshots, each behind its own async mutex.
//!
//! The outer map lock is only held long enough to look up or create a slot, so work on
//! one entity never waits on another. Holding a slot guard serializes ingestion and
//! reads for that entity: a reader never sees a half-rebuilt list.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Result, ServiceError};
use crate::ingest::types::Article;

type Slot = Arc<Mutex<Vec<Article>>>;

#[derive(Debug, Default)]
pub struct ArticleStore {
    slots: RwLock<HashMap<String, Slot>>,
}

impl ArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty slot for `entity_id` unless one exists.
    pub fn ensure(&self, entity_id: &str) {
        self.slot_or_create(entity_id);
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.slots
            .read()
            .expect("article store poisoned")
            .contains_key(entity_id)
    }

    /// Snapshot of the current article list.
    pub async fn get(&self, entity_id: &str) -> Result<Vec<Article>> {
        let guard = self.lock(entity_id).await?;
        Ok(guard.clone())
    }

    /// Exclusive access to an existing slot.
    pub async fn lock(&self, entity_id: &str) -> Result<OwnedMutexGuard<Vec<Article>>> {
        let slot = self
            .slots
            .read()
            .expect("article store poisoned")
            .get(entity_id)
            .cloned()
            .ok_or_else(|| ServiceError::entity_not_found(entity_id))?;
        Ok(slot.lock_owned().await)
    }

    /// Exclusive access, creating the slot on first use. Used by the ingestion writer.
    pub async fn lock_or_create(&self, entity_id: &str) -> OwnedMutexGuard<Vec<Article>> {
        self.slot_or_create(entity_id).lock_owned().await
    }

    fn slot_or_create(&self, entity_id: &str) -> Slot {
        if let Some(slot) = self
            .slots
            .read()
            .expect("article store poisoned")
            .get(entity_id)
        {
            return slot.clone();
        }
        self.slots
            .write()
            .expect("article store poisoned")
            .entry(entity_id.to_string())
            .or_default()
            .clone()
    }
}
