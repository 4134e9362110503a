// src/gate.rs
//! Dedup/persistence gate: the only path from a scraped posting to a stored
//! job.

use metrics::counter;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::store::{JobStore, StoreError};
use crate::types::{PersistedJob, Posting};

/// What one batch did at the gate.
#[derive(Debug, Default)]
pub struct Admission {
    /// Newly created jobs, in batch order.
    pub inserted: Vec<PersistedJob>,
    pub duplicates: usize,
    /// Postings without title or URL.
    pub rejected: usize,
    /// Set when the store failed; the rest of the batch was not attempted.
    pub error: Option<StoreError>,
}

#[derive(Clone)]
pub struct Gate {
    store: Arc<dyn JobStore>,
}

impl Gate {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Insert-if-absent for one posting, returning the stored job when this
    /// call created it.
    pub async fn admit_one(&self, posting: &Posting) -> Result<Option<PersistedJob>, StoreError> {
        if !self.store.insert_if_absent(posting).await? {
            counter!("gate_duplicates_total").increment(1);
            return Ok(None);
        }
        counter!("gate_inserted_total").increment(1);
        let job = self
            .store
            .get_by_key(&posting.url)
            .await?
            .ok_or_else(|| StoreError::Corrupt {
                url: posting.url.clone(),
                reason: "row vanished after insert".into(),
            })?;
        Ok(Some(job))
    }

    /// Admit a batch in order. A store failure stops the batch; jobs inserted
    /// before it stay inserted and are reported.
    pub async fn admit(&self, postings: &[Posting]) -> Admission {
        let mut out = Admission::default();
        for posting in postings {
            if !posting.is_well_formed() {
                warn!(target: "gate", source = %posting.source, "dropping posting without title or url");
                out.rejected += 1;
                continue;
            }
            match self.admit_one(posting).await {
                Ok(Some(job)) => {
                    debug!(target: "gate", url = %job.url, id = job.id, "new job");
                    out.inserted.push(job);
                }
                Ok(None) => out.duplicates += 1,
                Err(e) => {
                    error!(target: "gate", source = %posting.source, url = %posting.url, error = %e, "store failure");
                    counter!("gate_store_errors_total").increment(1);
                    out.error = Some(e);
                    break;
                }
            }
        }
        out
    }
}
