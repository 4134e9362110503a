//! One harvest cycle without email. Writes `test-results.json` (or the path
//! given as the first argument) with per-source totals and the new jobs.

use anyhow::{Context, Result};
use job_harvester::{telemetry, Harvester, HarvesterConfig};
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let out_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "test-results.json".to_string());

    let cfg = HarvesterConfig::load()?;
    let harvester = Harvester::from_config(&cfg, false).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let started = std::time::Instant::now();
    let report = harvester.run_once(&cancel).await?;

    let doc = json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "duration_secs": started.elapsed().as_secs_f64(),
        "status": report.run.status,
        "total_scraped": report.run.scraped(),
        "total_new": report.run.new_jobs.len(),
        "sources": report.run.sources,
        "new_jobs": report.run.new_jobs,
        "store": report.stats,
    });
    let body = serde_json::to_string_pretty(&doc)?;
    std::fs::write(&out_path, body).with_context(|| format!("writing {out_path}"))?;

    println!(
        "{} scraped, {} new, results in {out_path}",
        report.run.scraped(),
        report.run.new_jobs.len()
    );
    Ok(())
}
