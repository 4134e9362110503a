// src/config.rs
//! Harvester configuration.
//!
//! Resolution order:
//! 1) `$JOB_HARVESTER_CONFIG` (must exist when set)
//! 2) `config/harvester.toml`
//! 3) `config/harvester.json`
//! 4) built-in defaults
//!
//! Environment overrides are applied on top of whichever file was used.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::browser::{Browser, ContextConfig, StaticBrowser, Viewport};
use crate::filter::SearchScope;
use crate::orchestrator::{ExecutionMode, OrchestratorConfig};
use crate::sources::SourceId;

pub const ENV_PATH: &str = "JOB_HARVESTER_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarvesterConfig {
    pub search: SearchConfig,
    pub run: RunConfig,
    pub browser: BrowserConfig,
    pub store: StoreConfig,
    pub notify: NotifyConfig,
    /// Keyed by source id (`linkedin`, `stepstone`, ...).
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub keywords: Vec<String>,
    pub location: String,
    pub geo_tokens: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let scope = SearchScope::default();
        Self {
            keywords: scope.keywords,
            location: scope.location,
            geo_tokens: scope.geo_tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Concurrent,
    Sequential,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub mode: RunMode,
    /// Delay between sources in sequential mode.
    pub pacing_secs: u64,
    pub interval_hours: u64,
    pub adapter_timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Concurrent,
            pacing_secs: 5,
            interval_hours: 12,
            adapter_timeout_secs: 180,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Plain HTTP; server-rendered markup only.
    #[default]
    Http,
    /// Headless Chrome behind a Browserless endpoint.
    Browserless,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserConfig {
    pub engine: Engine,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Overrides every site's navigation timeout when set.
    pub navigation_timeout_secs: Option<u64>,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        let ctx = ContextConfig::default();
        Self {
            engine: Engine::Http,
            user_agent: None,
            accept_language: None,
            viewport_width: ctx.viewport.width,
            viewport_height: ctx.viewport.height,
            navigation_timeout_secs: None,
            browserless_url: None,
            browserless_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file, or `:memory:`.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "./data/jobs.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_user: Option<String>,
    #[serde(skip_serializing)]
    pub smtp_pass: Option<String>,
    /// Defaults to the SMTP user.
    pub from: Option<String>,
    pub to: Vec<String>,
    /// Build the digest from every undelivered job, not only this run's.
    pub retry_pending: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_user: None,
            smtp_pass: None,
            from: None,
            to: Vec::new(),
            retry_pending: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    pub enabled: Option<bool>,
    pub max_items: Option<usize>,
}

impl HarvesterConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::parse(&content, &ext)
    }

    /// File per the resolution order, without env overrides.
    pub fn load_file_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/harvester.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/harvester.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default().normalized())
    }

    /// File resolution plus process-environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file_default()?;
        cfg.apply_env(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn parse(s: &str, hint_ext: &str) -> Result<Self> {
        let parsed: Self = if hint_ext == "json" || s.trim_start().starts_with('{') {
            serde_json::from_str(s).context("parsing JSON config")?
        } else {
            toml::from_str(s).context("parsing TOML config")?
        };
        parsed.validate()?;
        Ok(parsed.normalized())
    }

    /// Apply overrides from `lookup` (the process env in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("SEARCH_KEYWORDS") {
            self.search.keywords = split_list(&v);
        }
        if let Some(v) = get("SEARCH_LOCATION") {
            self.search.location = v;
        }
        if let Some(v) = get("GEO_TOKENS") {
            self.search.geo_tokens = split_list(&v);
        }
        if let Some(v) = get("SOURCES") {
            let wanted = split_list(&v)
                .iter()
                .map(|s| s.parse::<SourceId>())
                .collect::<Result<Vec<_>>>()
                .context("SOURCES")?;
            for id in SourceId::ALL {
                self.sources.entry(id.as_str().to_string()).or_default().enabled = Some(wanted.contains(&id));
            }
        }
        if let Some(v) = get("SCRAPE_INTERVAL_HOURS") {
            self.run.interval_hours = v.parse().with_context(|| format!("SCRAPE_INTERVAL_HOURS `{v}`"))?;
        }
        if let Some(v) = get("SCRAPE_MODE") {
            self.run.mode = match v.to_ascii_lowercase().as_str() {
                "concurrent" => RunMode::Concurrent,
                "sequential" => RunMode::Sequential,
                other => bail!("SCRAPE_MODE must be concurrent or sequential, got `{other}`"),
            };
        }
        if let Some(v) = get("PACING_SECS") {
            self.run.pacing_secs = v.parse().with_context(|| format!("PACING_SECS `{v}`"))?;
        }
        if let Some(v) = get("DB_PATH") {
            self.store.path = v;
        }
        if let Some(v) = get("BROWSERLESS_URL") {
            self.browser.engine = Engine::Browserless;
            self.browser.browserless_url = Some(v);
        }
        if let Some(v) = get("BROWSERLESS_TOKEN") {
            self.browser.browserless_token = Some(v);
        }
        if let Some(v) = get("EMAIL_USER") {
            self.notify.smtp_user = Some(v);
        }
        if let Some(v) = get("EMAIL_PASS") {
            self.notify.smtp_pass = Some(v);
        }
        if let Some(v) = get("EMAIL_TO") {
            self.notify.to = split_list(&v);
        }
        if let Some(v) = get("EMAIL_FROM") {
            self.notify.from = Some(v);
        }
        if let Some(v) = get("SMTP_HOST") {
            self.notify.smtp_host = v;
        }

        self.validate()?;
        *self = std::mem::take(self).normalized();
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for key in self.sources.keys() {
            key.parse::<SourceId>()
                .with_context(|| format!("[sources.{key}]"))?;
        }
        if self.run.interval_hours == 0 {
            bail!("run.interval_hours must be at least 1");
        }
        if self.run.adapter_timeout_secs == 0 {
            bail!("run.adapter_timeout_secs must be at least 1");
        }
        if self.browser.engine == Engine::Browserless && self.browser.browserless_url.is_none() {
            bail!("browser.engine = \"browserless\" needs browser.browserless_url");
        }
        Ok(())
    }

    fn normalized(mut self) -> Self {
        self.search.keywords = clean_list(std::mem::take(&mut self.search.keywords));
        self.search.geo_tokens = clean_list(std::mem::take(&mut self.search.geo_tokens))
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect();
        self.search.location = self.search.location.trim().to_string();
        if self.search.location.is_empty() {
            self.search.location = SearchConfig::default().location;
        }
        self.notify.to = clean_list(std::mem::take(&mut self.notify.to));
        self
    }

    pub fn scope(&self) -> SearchScope {
        SearchScope {
            keywords: self.search.keywords.clone(),
            location: self.search.location.clone(),
            geo_tokens: self.search.geo_tokens.clone(),
        }
    }

    fn source(&self, id: SourceId) -> Option<&SourceConfig> {
        self.sources.get(id.as_str())
    }

    pub fn is_enabled(&self, id: SourceId) -> bool {
        self.source(id)
            .and_then(|s| s.enabled)
            .unwrap_or_else(|| id.enabled_by_default())
    }

    pub fn max_items(&self, id: SourceId) -> Option<usize> {
        self.source(id).and_then(|s| s.max_items)
    }

    pub fn enabled_sources(&self) -> Vec<SourceId> {
        SourceId::ALL.into_iter().filter(|id| self.is_enabled(*id)).collect()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.run.interval_hours * 3600)
    }

    pub fn navigation_timeout(&self) -> Option<Duration> {
        self.browser.navigation_timeout_secs.map(Duration::from_secs)
    }

    pub fn context_config(&self) -> ContextConfig {
        let mut ctx = ContextConfig::default();
        if let Some(ua) = &self.browser.user_agent {
            ctx.user_agent = ua.clone();
        }
        if let Some(lang) = &self.browser.accept_language {
            ctx.accept_language = lang.clone();
        }
        ctx.viewport = Viewport {
            width: self.browser.viewport_width,
            height: self.browser.viewport_height,
        };
        ctx
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            mode: match self.run.mode {
                RunMode::Concurrent => ExecutionMode::Concurrent,
                RunMode::Sequential => ExecutionMode::Sequential {
                    pacing: Duration::from_secs(self.run.pacing_secs),
                },
            },
            adapter_timeout: Duration::from_secs(self.run.adapter_timeout_secs),
            context: self.context_config(),
        }
    }

    pub fn build_browser(&self) -> Result<Arc<dyn Browser>> {
        let browser = match self.browser.engine {
            Engine::Http => StaticBrowser::http(),
            Engine::Browserless => {
                let url = self
                    .browser
                    .browserless_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("browserless engine without browserless_url"))?;
                StaticBrowser::browserless(url, self.browser.browserless_token.as_deref())
            }
        };
        Ok(Arc::new(browser))
    }
}

fn split_list(s: &str) -> Vec<String> {
    clean_list(s.split(',').map(String::from).collect())
}

/// Trim, drop empty entries and case-insensitive duplicates; order is kept
/// since the first keyword drives the search URLs.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o.eq_ignore_ascii_case(t)) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::{env, fs};

    #[test]
    fn clean_list_keeps_order() {
        let out = clean_list(vec![" rust ".into(), "".into(), "Go".into(), "RUST".into()]);
        assert_eq!(out, vec!["rust".to_string(), "Go".to_string()]);
    }

    #[test]
    fn toml_and_json_parse_to_the_same_config() {
        let toml = r#"
            [search]
            keywords = ["rust developer", " ", "backend"]
            location = "Munich"

            [run]
            mode = "sequential"
            pacing_secs = 3

            [sources.indeed]
            enabled = true
            max_items = 5
        "#;
        let json = r#"{
            "search": {"keywords": ["rust developer", "backend"], "location": "Munich"},
            "run": {"mode": "sequential", "pacing_secs": 3},
            "sources": {"indeed": {"enabled": true, "max_items": 5}}
        }"#;
        let a = HarvesterConfig::parse(toml, "toml").unwrap();
        let b = HarvesterConfig::parse(json, "json").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.search.keywords, vec!["rust developer", "backend"]);
        assert!(a.is_enabled(SourceId::Indeed));
        assert!(!a.is_enabled(SourceId::Glassdoor));
        assert_eq!(a.max_items(SourceId::Indeed), Some(5));
        assert_eq!(
            a.orchestrator_config().mode,
            ExecutionMode::Sequential {
                pacing: Duration::from_secs(3)
            }
        );
    }

    #[test]
    fn unknown_source_section_is_rejected() {
        let err = HarvesterConfig::parse("[sources.monster]\nenabled = true\n", "toml").unwrap_err();
        assert!(format!("{err:#}").contains("monster"));
    }

    #[test]
    fn env_overrides_apply_on_top() {
        let vars: HashMap<&str, &str> = [
            ("SEARCH_KEYWORDS", "rust, go ,"),
            ("GEO_TOKENS", "Munich,Remote"),
            ("SOURCES", "linkedin,apple"),
            ("SCRAPE_MODE", "sequential"),
            ("PACING_SECS", "9"),
            ("DB_PATH", "/tmp/x.db"),
            ("EMAIL_TO", "a@x.test,b@x.test"),
        ]
        .into_iter()
        .collect();
        let mut cfg = HarvesterConfig::default();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.search.keywords, vec!["rust", "go"]);
        assert_eq!(cfg.search.geo_tokens, vec!["munich", "remote"]);
        assert_eq!(cfg.enabled_sources(), vec![SourceId::LinkedIn, SourceId::Apple]);
        assert_eq!(cfg.run.mode, RunMode::Sequential);
        assert_eq!(cfg.run.pacing_secs, 9);
        assert_eq!(cfg.store.path, "/tmp/x.db");
        assert_eq!(cfg.notify.to.len(), 2);
    }

    #[test]
    fn bad_env_values_are_errors() {
        let mut cfg = HarvesterConfig::default();
        assert!(cfg
            .apply_env(|k| (k == "SCRAPE_MODE").then(|| "parallel".to_string()))
            .is_err());
        let mut cfg = HarvesterConfig::default();
        assert!(cfg
            .apply_env(|k| (k == "SOURCES").then(|| "linkedin,monster".to_string()))
            .is_err());
    }

    #[test]
    fn default_sources_skip_bot_walled_sites() {
        let cfg = HarvesterConfig::default();
        let enabled = cfg.enabled_sources();
        assert_eq!(enabled.len(), 6);
        assert!(!enabled.contains(&SourceId::Indeed));
        assert!(!enabled.contains(&SourceId::Glassdoor));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_PATH);

        // No files: defaults.
        let cfg = HarvesterConfig::load_file_default().unwrap();
        assert_eq!(cfg, HarvesterConfig::default().normalized());

        // JSON only.
        fs::create_dir_all("config").unwrap();
        fs::write("config/harvester.json", r#"{"search": {"location": "Berlin"}}"#).unwrap();
        assert_eq!(HarvesterConfig::load_file_default().unwrap().search.location, "Berlin");

        // TOML wins over JSON.
        fs::write("config/harvester.toml", "[search]\nlocation = \"Hamburg\"\n").unwrap();
        assert_eq!(HarvesterConfig::load_file_default().unwrap().search.location, "Hamburg");

        // Env path wins over both.
        let custom = tmp.path().join("custom.toml");
        fs::write(&custom, "[search]\nlocation = \"Garching\"\n").unwrap();
        env::set_var(ENV_PATH, &custom);
        assert_eq!(HarvesterConfig::load_file_default().unwrap().search.location, "Garching");

        // Env path must exist.
        env::set_var(ENV_PATH, tmp.path().join("missing.toml"));
        assert!(HarvesterConfig::load_file_default().is_err());

        env::remove_var(ENV_PATH);
        env::set_current_dir(old).unwrap();
    }
}
