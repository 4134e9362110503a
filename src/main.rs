//! Job harvester daemon.
//! Runs one cycle at startup, then every `run.interval_hours`, until Ctrl-C
//! or SIGTERM. A signal cancels the in-flight cycle; browsing contexts are
//! released before the process exits.

use anyhow::Result;
use job_harvester::{telemetry, Harvester, HarvesterConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let term = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let term = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = term => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        telemetry::install_prometheus(&addr)?;
    }

    let cfg = HarvesterConfig::load()?;
    let harvester = Harvester::from_config(&cfg, true).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("shutting down job harvester");
            cancel.cancel();
        });
    }

    let mut ticker = tokio::time::interval(cfg.interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(every_hours = cfg.run.interval_hours, "job harvester running; Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        info!(target: "run", "cycle started");
        match harvester.run_once(&cancel).await {
            Ok(report) => {
                if let Some(e) = &report.notify_error {
                    warn!(target: "run", error = %e, "cycle finished without notification");
                }
                info!(
                    target: "run",
                    status = ?report.run.status,
                    new = report.run.new_jobs.len(),
                    notified = report.notified,
                    "cycle finished"
                );
            }
            // Fatal for this cycle only; the next tick tries again.
            Err(e) => error!(target: "run", error = %e, "cycle aborted"),
        }

        if cancel.is_cancelled() {
            break;
        }
    }

    info!("job harvester stopped");
    Ok(())
}
