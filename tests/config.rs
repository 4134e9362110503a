// tests/config.rs
use job_harvester::config::RunMode;
use job_harvester::{ExecutionMode, HarvesterConfig, SourceId};
use serial_test::serial;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[test]
fn shipped_example_config_parses() {
    let cfg = HarvesterConfig::load_from(Path::new("config/harvester.example.toml")).expect("example config");
    assert_eq!(cfg.search.keywords, vec!["software engineer", "computer science"]);
    assert_eq!(cfg.run.mode, RunMode::Concurrent);
    assert_eq!(cfg.max_items(SourceId::LinkedIn), Some(50));
    assert!(!cfg.is_enabled(SourceId::Indeed));
    assert!(cfg.is_enabled(SourceId::Apple));
}

#[test]
fn env_switches_to_sequential_with_pacing() {
    let env: HashMap<&str, &str> = [("SCRAPE_MODE", "Sequential"), ("PACING_SECS", "2")].into();
    let mut cfg = HarvesterConfig::default();
    cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

    assert_eq!(
        cfg.orchestrator_config().mode,
        ExecutionMode::Sequential {
            pacing: Duration::from_secs(2)
        }
    );
}

#[test]
fn sources_env_is_an_allow_list() {
    let env: HashMap<&str, &str> = [("SOURCES", "linkedin, Google-Careers ,indeed")].into();
    let mut cfg = HarvesterConfig::default();
    cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

    assert_eq!(
        cfg.enabled_sources(),
        vec![SourceId::LinkedIn, SourceId::Indeed, SourceId::GoogleCareers]
    );
}

#[serial]
#[test]
fn load_reads_file_named_by_env_then_env_overrides() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("harvester.json");
    std::fs::write(
        &path,
        r#"{"search": {"location": "Garching"}, "store": {"path": ":memory:"}}"#,
    )
    .unwrap();

    std::env::set_var("JOB_HARVESTER_CONFIG", &path);
    std::env::set_var("SEARCH_KEYWORDS", "rust,Rust, embedded ");
    let cfg = HarvesterConfig::load();
    std::env::remove_var("JOB_HARVESTER_CONFIG");
    std::env::remove_var("SEARCH_KEYWORDS");

    let cfg = cfg.unwrap();
    assert_eq!(cfg.search.location, "Garching");
    assert_eq!(cfg.store.path, ":memory:");
    assert_eq!(cfg.search.keywords, vec!["rust", "embedded"]);
}
