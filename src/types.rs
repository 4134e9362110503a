// src/types.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Company name used when no structural locator or fallback yields one.
pub const UNKNOWN_COMPANY: &str = "Unknown";

/// One normalized job listing as produced by a source adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Posting {
    pub title: String,
    pub company: String,
    pub location: String,
    /// Absolute, canonical URL. Identity key for dedup.
    pub url: String,
    pub description: String,
    pub posted_date: NaiveDate,
    pub source: String,
}

impl Posting {
    /// Title and URL must be present before a posting leaves an adapter.
    pub fn is_well_formed(&self) -> bool {
        !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }
}

/// Why an adapter run ended the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOutcome {
    Complete,
    NavigationFailed(String),
    NoListings,
    Cancelled,
    TimedOut,
    Failed(String),
}

impl SourceOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SourceOutcome::NavigationFailed(_) | SourceOutcome::TimedOut | SourceOutcome::Failed(_)
        )
    }
}

/// An adapter's output for one run, postings in scrape order.
#[derive(Debug, Clone)]
pub struct SourceResult {
    pub source: String,
    pub postings: Vec<Posting>,
    pub outcome: SourceOutcome,
}

impl SourceResult {
    pub fn empty(source: impl Into<String>, outcome: SourceOutcome) -> Self {
        Self {
            source: source.into(),
            postings: Vec::new(),
            outcome,
        }
    }
}

/// Stored job row. Created by the gate, only `notified` ever changes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PersistedJob {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: String,
    pub source: String,
    pub posted_date: Option<NaiveDate>,
    pub scraped_at: DateTime<Utc>,
    pub notified: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub total: u64,
    pub notified: u64,
    pub pending: u64,
}
