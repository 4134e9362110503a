// src/store/memory.rs
//! In-memory store for tests and dry runs. Data is lost on drop.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{JobStore, StoreError, StoreResult};
use crate::types::{PersistedJob, Posting, StoreStats};

#[derive(Default)]
struct Inner {
    by_url: HashMap<String, usize>,
    rows: Vec<PersistedJob>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".into())
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_if_absent(&self, posting: &Posting) -> StoreResult<bool> {
        // Check and insert under one write lock.
        let mut inner = self.inner.write().map_err(poisoned)?;
        if inner.by_url.contains_key(&posting.url) {
            return Ok(false);
        }
        let idx = inner.rows.len();
        inner.rows.push(PersistedJob {
            id: idx as i64 + 1,
            title: posting.title.clone(),
            company: posting.company.clone(),
            location: posting.location.clone(),
            url: posting.url.clone(),
            description: posting.description.clone(),
            source: posting.source.clone(),
            posted_date: Some(posting.posted_date),
            scraped_at: Utc::now(),
            notified: false,
        });
        inner.by_url.insert(posting.url.clone(), idx);
        Ok(true)
    }

    async fn get_by_key(&self, url: &str) -> StoreResult<Option<PersistedJob>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.by_url.get(url).map(|&i| inner.rows[i].clone()))
    }

    async fn mark_notified(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let row = inner
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        row.notified = true;
        Ok(())
    }

    async fn list_unnotified(&self) -> StoreResult<Vec<PersistedJob>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.rows.iter().filter(|r| !r.notified).cloned().collect())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let inner = self.inner.read().map_err(poisoned)?;
        let total = inner.rows.len() as u64;
        let notified = inner.rows.iter().filter(|r| r.notified).count() as u64;
        Ok(StoreStats {
            total,
            notified,
            pending: total - notified,
        })
    }
}
