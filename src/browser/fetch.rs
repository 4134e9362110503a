// src/browser/fetch.rs
//! Where page HTML comes from: direct HTTP, a Browserless `/content`
//! endpoint, or an in-memory fixture map.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{BrowserError, BrowserResult, ContextConfig, GotoOptions};

#[async_trait]
pub trait HtmlSource: Send + Sync {
    async fn fetch(&self, url: &str, ctx: &ContextConfig, opts: GotoOptions) -> BrowserResult<String>;
}

/// Plain HTTP GET. Sees server-rendered markup only.
pub struct HttpSource {
    client: reqwest::Client,
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HtmlSource for HttpSource {
    async fn fetch(&self, url: &str, ctx: &ContextConfig, opts: GotoOptions) -> BrowserResult<String> {
        let mut req = self.client.get(url).timeout(opts.timeout);
        for (k, v) in ctx.headers() {
            req = req.header(k, v);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                BrowserError::Timeout {
                    what: format!("GET {url}"),
                    after: opts.timeout,
                }
            } else {
                BrowserError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BrowserError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}

/// Headless Chrome behind Browserless: JavaScript is executed before the
/// HTML is returned.
pub struct BrowserlessSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessSource {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }
}

#[async_trait]
impl HtmlSource for BrowserlessSource {
    async fn fetch(&self, url: &str, ctx: &ContextConfig, opts: GotoOptions) -> BrowserResult<String> {
        let headers: HashMap<String, String> = ctx
            .headers()
            .into_iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case("user-agent"))
            .collect();

        let body = json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": opts.wait_until.as_str(),
                "timeout": opts.timeout.as_millis() as u64,
            },
            "setExtraHTTPHeaders": headers,
            "userAgent": ctx.user_agent,
            "viewport": {
                "width": ctx.viewport.width,
                "height": ctx.viewport.height,
            },
        });

        // Rendering time is bounded by Browserless itself; leave headroom.
        let resp = self
            .client
            .post(self.endpoint())
            .timeout(opts.timeout + std::time::Duration::from_secs(5))
            .json(&body)
            .send()
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::debug!(target: "browser", %status, %message, "browserless rejected request");
            return Err(BrowserError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}

/// URL → HTML map. Unknown URLs fail like a 404.
#[derive(Default)]
pub struct FixtureSource {
    pages: RwLock<HashMap<String, String>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.insert(url, html);
        self
    }

    pub fn insert(&self, url: impl Into<String>, html: impl Into<String>) {
        if let Ok(mut pages) = self.pages.write() {
            pages.insert(url.into(), html.into());
        }
    }
}

#[async_trait]
impl HtmlSource for FixtureSource {
    async fn fetch(&self, url: &str, _ctx: &ContextConfig, _opts: GotoOptions) -> BrowserResult<String> {
        let pages = self
            .pages
            .read()
            .map_err(|_| BrowserError::Network("fixture map poisoned".into()))?;
        pages.get(url).cloned().ok_or_else(|| BrowserError::Http {
            status: 404,
            url: url.to_string(),
        })
    }
}
