// src/browser/mod.rs
//! Rendering-engine capability surface consumed by the adapters.
//!
//! Adapters only see these traits. `StaticBrowser` is the shipped engine: it
//! materializes pages through an [`HtmlSource`] (direct HTTP, Browserless, or
//! in-memory fixtures) and answers DOM queries from a parsed snapshot.

pub mod fetch;
pub mod static_dom;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use fetch::{BrowserlessSource, FixtureSource, HtmlSource, HttpSource};
pub use static_dom::StaticBrowser;

pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Bounded wait for closing a page or context.
pub const CLOSE_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("HTTP status {status} for {url}")]
    Http { status: u16, url: String },

    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },

    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("no page loaded")]
    NotLoaded,

    #[error("{0} is not supported by this engine")]
    Unsupported(&'static str),

    #[error("network error: {0}")]
    Network(String),

    #[error("could not open browsing context: {0}")]
    Context(String),
}

impl From<reqwest::Error> for BrowserError {
    fn from(err: reqwest::Error) -> Self {
        BrowserError::Network(err.to_string())
    }
}

/// Lifecycle event a navigation waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    #[default]
    DomContentLoaded,
    Load,
    NetworkIdle,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::Load => "load",
            WaitUntil::NetworkIdle => "networkidle2",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GotoOptions {
    pub wait_until: WaitUntil,
    pub timeout: Duration,
}

impl Default for GotoOptions {
    fn default() -> Self {
        Self {
            wait_until: WaitUntil::DomContentLoaded,
            timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Per-context identity. Fingerprint hygiene only, not a correctness concern.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub viewport: Viewport,
    pub extra_headers: Vec<(String, String)>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept_language: "de-DE,de;q=0.9,en;q=0.8".to_string(),
            viewport: Viewport {
                width: 1366,
                height: 768,
            },
            extra_headers: Vec::new(),
        }
    }
}

impl ContextConfig {
    /// All request headers this context sends, user agent first.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut out = vec![
            ("User-Agent".to_string(), self.user_agent.clone()),
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language".to_string(), self.accept_language.clone()),
        ];
        out.extend(self.extra_headers.iter().cloned());
        out
    }
}

#[async_trait]
pub trait Browser: Send + Sync {
    /// Open an isolated browsing context. Contexts share no state.
    async fn new_context(&self, cfg: &ContextConfig) -> BrowserResult<Box<dyn BrowserContext>>;
}

#[async_trait]
pub trait BrowserContext: Send + Sync {
    async fn new_page(&mut self) -> BrowserResult<Box<dyn Page>>;
    async fn close(&mut self) -> BrowserResult<()>;
}

#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&mut self, url: &str, opts: GotoOptions) -> BrowserResult<()>;

    /// Every element matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn ElementHandle>>>;

    /// Click the first element matching `selector`. `Ok(false)` when absent.
    async fn click(&mut self, selector: &str) -> BrowserResult<bool>;

    async fn fill(&mut self, selector: &str, value: &str) -> BrowserResult<()>;

    fn url(&self) -> Option<&str>;

    async fn close(&mut self) -> BrowserResult<()>;
}

#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Raw text content (not trimmed).
    async fn text(&self) -> BrowserResult<String>;

    /// Text split into its rendered lines, trimmed, empty lines dropped.
    async fn text_lines(&self) -> BrowserResult<Vec<String>>;

    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>>;

    async fn is_visible(&self) -> BrowserResult<bool>;

    /// Descendants matching `selector` (the element itself excluded).
    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn ElementHandle>>>;
}
