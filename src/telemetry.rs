// src/telemetry.rs
//! Logging and metrics setup shared by the binaries.

use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "job_harvester=info,warn";

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scrape_postings_total", "Relevant postings emitted per source.");
        describe_counter!(
            "scrape_items_skipped_total",
            "Job cards dropped during extraction, by reason."
        );
        describe_counter!(
            "scrape_source_failures_total",
            "Adapter runs that ended without a result (navigation, timeout, error)."
        );
        describe_histogram!("scrape_source_duration_ms", "Adapter run time in milliseconds.");
        describe_counter!("gate_inserted_total", "Postings newly persisted.");
        describe_counter!("gate_duplicates_total", "Postings already known by URL.");
        describe_counter!("gate_store_errors_total", "Store failures at the gate.");
        describe_counter!("notify_sent_total", "Jobs delivered in a digest.");
        describe_counter!("notify_failures_total", "Failed digest deliveries.");
        describe_gauge!("run_last_completed_ts", "Unix ts when the last run completed.");
    });
}

/// Expose `/metrics` on `addr` with the Prometheus exposition format.
pub fn install_prometheus(addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("METRICS_ADDR `{addr}` is not a socket address"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install recorder")?;
    ensure_metrics_described();
    tracing::info!(%addr, "metrics listener started");
    Ok(())
}
