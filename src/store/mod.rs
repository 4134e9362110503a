// src/store/mod.rs
//! Persistent job store.
//!
//! The store is the only state shared between concurrently running adapters.
//! Every write of a new posting goes through [`JobStore::insert_if_absent`],
//! which must be atomic with respect to URL uniqueness.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{PersistedJob, Posting, StoreStats};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("no job with id {0}")]
    NotFound(i64),

    #[error("corrupt row for {url}: {reason}")]
    Corrupt { url: String, reason: String },
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist `posting` unless its URL is already known. `true` iff this
    /// call created the row; a duplicate is `Ok(false)`, never an error.
    async fn insert_if_absent(&self, posting: &Posting) -> StoreResult<bool>;

    async fn get_by_key(&self, url: &str) -> StoreResult<Option<PersistedJob>>;

    async fn mark_notified(&self, id: i64) -> StoreResult<()>;

    /// Jobs never delivered, oldest first.
    async fn list_unnotified(&self) -> StoreResult<Vec<PersistedJob>>;

    async fn stats(&self) -> StoreResult<StoreStats>;
}

/// Open the configured store. `:memory:` selects an ephemeral SQLite database.
pub async fn open(path: &str) -> StoreResult<Arc<dyn JobStore>> {
    let store = if path == ":memory:" || path == "sqlite::memory:" {
        SqliteStore::in_memory().await?
    } else {
        SqliteStore::open(path).await?
    };
    Ok(Arc::new(store))
}
