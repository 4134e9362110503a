// src/notify/mod.rs
//! Notification collaborator: composes a digest of new jobs, sends it, and
//! marks jobs notified only after the send succeeded. A failed send leaves
//! every job persisted and pending.

pub mod digest;
pub mod email;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::NotifyConfig;
use crate::store::JobStore;
use crate::types::PersistedJob;

pub use digest::Digest;
pub use email::EmailNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, digest: &Digest) -> Result<()>;
}

/// Writes the digest to the log. Used when no SMTP credentials are set.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, digest: &Digest) -> Result<()> {
        info!(target: "notify", subject = %digest.subject, "digest (log only)\n{}", digest.text);
        Ok(())
    }
}

/// Email when configured and enabled, otherwise the log.
pub fn from_config(cfg: &NotifyConfig) -> Result<Arc<dyn Notifier>> {
    if cfg.enabled {
        if let Some(email) = EmailNotifier::from_config(cfg)? {
            return Ok(Arc::new(email));
        }
        warn!(target: "notify", "email credentials missing; falling back to log notifier");
    }
    Ok(Arc::new(LogNotifier))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub sent: usize,
    pub marked: usize,
}

/// Send one digest for `jobs`, then flag each delivered job. Nothing is
/// rolled back when the send fails.
pub async fn deliver(
    notifier: &dyn Notifier,
    store: &dyn JobStore,
    jobs: &[PersistedJob],
    location: &str,
) -> Result<Delivery> {
    if jobs.is_empty() {
        info!(target: "notify", "no jobs to notify about");
        return Ok(Delivery::default());
    }

    let digest = Digest::build(jobs, location);
    if let Err(e) = notifier.send(&digest).await {
        counter!("notify_failures_total").increment(1);
        error!(target: "notify", notifier = notifier.name(), jobs = jobs.len(), error = ?e, "digest delivery failed");
        return Err(e);
    }
    counter!("notify_sent_total").increment(jobs.len() as u64);

    let mut marked = 0;
    for job in jobs {
        match store.mark_notified(job.id).await {
            Ok(()) => marked += 1,
            Err(e) => warn!(target: "notify", id = job.id, url = %job.url, error = %e, "mark notified failed"),
        }
    }
    info!(target: "notify", notifier = notifier.name(), sent = jobs.len(), marked, "digest delivered");

    Ok(Delivery {
        sent: jobs.len(),
        marked,
    })
}
