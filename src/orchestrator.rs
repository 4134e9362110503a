// src/orchestrator.rs
//! Runs every enabled adapter, each on its own browsing context, and pushes
//! each adapter's postings through the gate as soon as that adapter is done.

use futures::FutureExt;
use metrics::counter;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::browser::{Browser, ContextConfig, CLOSE_WAIT};
use crate::gate::Gate;
use crate::sources::SourceAdapter;
use crate::telemetry::ensure_metrics_described;
use crate::types::{PersistedJob, SourceOutcome, SourceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// All adapters at once, gated in completion order.
    #[default]
    Concurrent,
    /// One adapter at a time with a fixed delay between sources.
    Sequential { pacing: Duration },
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub mode: ExecutionMode,
    /// Hard cap on one adapter run, context acquisition included.
    pub adapter_timeout: Duration,
    pub context: ContextConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Concurrent,
            adapter_timeout: Duration::from_secs(180),
            context: ContextConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not acquire a browsing context for any of {0} sources")]
    NoBrowser(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// The store failed for at least one batch.
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub outcome: SourceOutcome,
    pub scraped: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    /// Sources in completion order.
    pub sources: Vec<SourceReport>,
    /// Jobs created by this run, in completion order.
    pub new_jobs: Vec<PersistedJob>,
    pub store_errors: Vec<String>,
}

impl RunReport {
    pub fn scraped(&self) -> usize {
        self.sources.iter().map(|s| s.scraped).sum()
    }
}

struct SourceRun {
    result: SourceResult,
    acquired: bool,
    elapsed: Duration,
}

pub struct Orchestrator {
    browser: Arc<dyn Browser>,
    gate: Gate,
    cfg: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(browser: Arc<dyn Browser>, gate: Gate, cfg: OrchestratorConfig) -> Self {
        Self { browser, gate, cfg }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// One full pass over `adapters`. Source failures only shrink the result;
    /// the run fails only when no source could get a browsing context.
    pub async fn run(
        &self,
        adapters: &[Arc<dyn SourceAdapter>],
        cancel: &CancellationToken,
    ) -> Result<RunReport, RunError> {
        ensure_metrics_described();

        let mut report = RunReport {
            status: RunStatus::Completed,
            sources: Vec::with_capacity(adapters.len()),
            new_jobs: Vec::new(),
            store_errors: Vec::new(),
        };
        let mut acquired = 0usize;

        match self.cfg.mode {
            ExecutionMode::Concurrent => {
                let mut set = JoinSet::new();
                for adapter in adapters {
                    let browser = Arc::clone(&self.browser);
                    let adapter = Arc::clone(adapter);
                    let ctx_cfg = self.cfg.context.clone();
                    let timeout = self.cfg.adapter_timeout;
                    let cancel = cancel.clone();
                    set.spawn(async move { run_source(browser, adapter, ctx_cfg, timeout, cancel).await });
                }
                while let Some(joined) = set.join_next().await {
                    match joined {
                        Ok(run) => {
                            acquired += usize::from(run.acquired);
                            self.admit(run, &mut report).await;
                        }
                        Err(e) => error!(target: "run", error = %e, "adapter task aborted"),
                    }
                }
            }
            ExecutionMode::Sequential { pacing } => {
                for (i, adapter) in adapters.iter().enumerate() {
                    if i > 0 && !pacing.is_zero() {
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            _ = tokio::time::sleep(pacing) => {}
                        }
                    }
                    if cancel.is_cancelled() {
                        let run = SourceRun {
                            result: SourceResult::empty(adapter.name(), SourceOutcome::Cancelled),
                            acquired: false,
                            elapsed: Duration::ZERO,
                        };
                        self.admit(run, &mut report).await;
                        continue;
                    }
                    let run = run_source(
                        Arc::clone(&self.browser),
                        Arc::clone(adapter),
                        self.cfg.context.clone(),
                        self.cfg.adapter_timeout,
                        cancel.clone(),
                    )
                    .await;
                    acquired += usize::from(run.acquired);
                    self.admit(run, &mut report).await;
                }
            }
        }

        let attempted = report
            .sources
            .iter()
            .filter(|s| s.outcome != SourceOutcome::Cancelled)
            .count();
        if attempted > 0 && acquired == 0 {
            error!(target: "run", sources = attempted, "no browsing context could be acquired");
            return Err(RunError::NoBrowser(attempted));
        }

        info!(
            target: "run",
            status = ?report.status,
            scraped = report.scraped(),
            new = report.new_jobs.len(),
            "run finished"
        );
        Ok(report)
    }

    async fn admit(&self, run: SourceRun, report: &mut RunReport) {
        let SourceRun { result, elapsed, .. } = run;
        let admission = self.gate.admit(&result.postings).await;

        if let Some(e) = admission.error {
            report.status = RunStatus::Degraded;
            report.store_errors.push(format!("{}: {e}", result.source));
        }

        info!(
            target: "run",
            source = %result.source,
            outcome = ?result.outcome,
            scraped = result.postings.len(),
            inserted = admission.inserted.len(),
            duplicates = admission.duplicates,
            "source done"
        );

        report.sources.push(SourceReport {
            source: result.source,
            outcome: result.outcome,
            scraped: result.postings.len(),
            inserted: admission.inserted.len(),
            duplicates: admission.duplicates,
            rejected: admission.rejected,
            elapsed_ms: elapsed.as_millis() as u64,
        });
        report.new_jobs.extend(admission.inserted);
    }
}

/// Acquire a context, run the adapter under the timeout and the abort
/// signal, then close the context on every path.
async fn run_source(
    browser: Arc<dyn Browser>,
    adapter: Arc<dyn SourceAdapter>,
    base: ContextConfig,
    timeout: Duration,
    cancel: CancellationToken,
) -> SourceRun {
    let started = Instant::now();
    let name = adapter.name().to_string();
    let ctx_cfg = adapter.context_config(&base);

    let acquired = tokio::select! {
        _ = cancel.cancelled() => None,
        r = tokio::time::timeout(timeout, browser.new_context(&ctx_cfg)) => Some(r),
    };
    let mut ctx = match acquired {
        None => {
            return SourceRun {
                result: SourceResult::empty(name, SourceOutcome::Cancelled),
                acquired: false,
                elapsed: started.elapsed(),
            }
        }
        Some(Ok(Ok(ctx))) => ctx,
        Some(Ok(Err(e))) => {
            warn!(target: "run", source = %name, error = %e, "context acquisition failed");
            counter!("scrape_source_failures_total", "source" => name.clone()).increment(1);
            return SourceRun {
                result: SourceResult::empty(name, SourceOutcome::Failed(e.to_string())),
                acquired: false,
                elapsed: started.elapsed(),
            };
        }
        Some(Err(_)) => {
            warn!(target: "run", source = %name, "context acquisition timed out");
            counter!("scrape_source_failures_total", "source" => name.clone()).increment(1);
            return SourceRun {
                result: SourceResult::empty(name, SourceOutcome::TimedOut),
                acquired: false,
                elapsed: started.elapsed(),
            };
        }
    };

    let remaining = timeout.saturating_sub(started.elapsed());
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!(target: "run", source = %name, "cancelled");
            SourceResult::empty(name.clone(), SourceOutcome::Cancelled)
        }
        r = tokio::time::timeout(remaining, AssertUnwindSafe(adapter.scrape(ctx.as_mut())).catch_unwind()) => match r {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => {
                warn!(target: "run", source = %name, error = ?e, "adapter error");
                SourceResult::empty(name.clone(), SourceOutcome::Failed(format!("{e:#}")))
            }
            Ok(Err(_)) => {
                error!(target: "run", source = %name, "adapter panicked");
                SourceResult::empty(name.clone(), SourceOutcome::Failed("adapter panicked".into()))
            }
            Err(_) => {
                warn!(target: "run", source = %name, after = ?remaining, "adapter timed out");
                SourceResult::empty(name.clone(), SourceOutcome::TimedOut)
            }
        },
    };

    if result.outcome.is_failure() {
        counter!("scrape_source_failures_total", "source" => name.clone()).increment(1);
    }

    match tokio::time::timeout(CLOSE_WAIT, ctx.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(target: "run", source = %name, error = %e, "context close failed"),
        Err(_) => error!(target: "run", source = %name, after = ?CLOSE_WAIT, "context close timed out"),
    }

    SourceRun {
        result,
        acquired: true,
        elapsed: started.elapsed(),
    }
}
