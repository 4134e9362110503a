// tests/metrics_run.rs
#![cfg(feature = "strict-metrics")]
use job_harvester::browser::{FixtureSource, StaticBrowser};
use job_harvester::filter::SearchScope;
use job_harvester::sources::{linkedin, ListingAdapter, SourceAdapter, SourceId};
use job_harvester::store::MemoryStore;
use job_harvester::{Harvester, OrchestratorConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn metrics_exposed_after_a_run() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");

    let scope = SearchScope::default();
    let html = std::fs::read_to_string("tests/fixtures/linkedin_search.html").expect("fixture");
    let pages = FixtureSource::new().with_page(linkedin::search_url(&scope), html);
    let adapter = ListingAdapter::new(SourceId::LinkedIn.profile(&scope), Arc::new(scope));

    let h = Harvester::new(
        Arc::new(StaticBrowser::fixtures(pages)),
        Arc::new(MemoryStore::new()),
        vec![Arc::new(adapter) as Arc<dyn SourceAdapter>],
        OrchestratorConfig::default(),
    );
    let report = h.run_once(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.run.new_jobs.len(), 2);

    let out = handle.render();
    for needle in [
        "scrape_postings_total",
        "scrape_items_skipped_total",
        "reason=\"irrelevant\"",
        "reason=\"duplicate\"",
        "scrape_source_duration_ms",
        "gate_inserted_total",
        "run_last_completed_ts",
    ] {
        assert!(out.contains(needle), "missing {needle} in:\n{out}");
    }
}
