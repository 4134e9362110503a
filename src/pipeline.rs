// src/pipeline.rs
//! One harvest cycle: scrape every enabled source, gate, notify, report.

use anyhow::{Context, Result};
use metrics::gauge;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::browser::Browser;
use crate::config::HarvesterConfig;
use crate::gate::Gate;
use crate::notify::{self, Notifier};
use crate::orchestrator::{Orchestrator, OrchestratorConfig, RunError, RunReport};
use crate::sources::{build_adapters, SourceAdapter};
use crate::store::{self, JobStore};
use crate::types::{PersistedJob, StoreStats};

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub run: RunReport,
    /// Jobs delivered and flagged in this cycle.
    pub notified: usize,
    pub notify_error: Option<String>,
    pub stats: Option<StoreStats>,
}

pub struct Harvester {
    orchestrator: Orchestrator,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    notifier: Option<Arc<dyn Notifier>>,
    retry_pending: bool,
    location: String,
}

impl Harvester {
    pub fn new(
        browser: Arc<dyn Browser>,
        store: Arc<dyn JobStore>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        cfg: OrchestratorConfig,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(browser, Gate::new(store), cfg),
            adapters,
            notifier: None,
            retry_pending: false,
            location: String::new(),
        }
    }

    /// Send a digest after each run.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>, location: impl Into<String>) -> Self {
        self.notifier = Some(notifier);
        self.location = location.into();
        self
    }

    pub fn retry_pending(mut self, on: bool) -> Self {
        self.retry_pending = on;
        self
    }

    /// Everything wired from config. `notify = false` leaves the notifier out.
    pub async fn from_config(cfg: &HarvesterConfig, notify: bool) -> Result<Self> {
        let store = store::open(&cfg.store.path)
            .await
            .with_context(|| format!("opening store at {}", cfg.store.path))?;
        let browser = cfg.build_browser()?;
        let adapters = build_adapters(cfg);
        info!(
            target: "run",
            sources = ?adapters.iter().map(|a| a.name()).collect::<Vec<_>>(),
            mode = ?cfg.run.mode,
            "harvester configured"
        );

        let mut h = Self::new(browser, store, adapters, cfg.orchestrator_config())
            .retry_pending(cfg.notify.retry_pending);
        if notify {
            h = h.with_notifier(notify::from_config(&cfg.notify)?, cfg.search.location.clone());
        }
        Ok(h)
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        self.orchestrator.gate().store()
    }

    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<CycleReport, RunError> {
        let run = self.orchestrator.run(&self.adapters, cancel).await?;
        let store = self.store();

        let mut notified = 0;
        let mut notify_error = None;
        if let Some(notifier) = &self.notifier {
            if cancel.is_cancelled() {
                info!(target: "notify", pending = run.new_jobs.len(), "cancelled; digest deferred");
            } else {
                let jobs = self.jobs_to_notify(&run).await;
                match notify::deliver(notifier.as_ref(), store.as_ref(), &jobs, &self.location).await {
                    Ok(d) => notified = d.marked,
                    Err(e) => notify_error = Some(format!("{e:#}")),
                }
            }
        }

        let stats = match store.stats().await {
            Ok(s) => {
                info!(target: "run", total = s.total, notified = s.notified, pending = s.pending, "store stats");
                Some(s)
            }
            Err(e) => {
                warn!(target: "run", error = %e, "store stats unavailable");
                None
            }
        };

        gauge!("run_last_completed_ts").set(chrono::Utc::now().timestamp() as f64);

        Ok(CycleReport {
            run,
            notified,
            notify_error,
            stats,
        })
    }

    async fn jobs_to_notify(&self, run: &RunReport) -> Vec<PersistedJob> {
        if !self.retry_pending {
            return run.new_jobs.clone();
        }
        match self.store().list_unnotified().await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(target: "notify", error = %e, "listing pending jobs failed; notifying this run only");
                run.new_jobs.clone()
            }
        }
    }
}
