// src/browser/static_dom.rs
//! DOM-snapshot engine. A page keeps the HTML of its last navigation and
//! parses it per query; element handles are owned snapshots that remember
//! their position in that document, so they are `Send` and outlive the page.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;

use super::fetch::{BrowserlessSource, FixtureSource, HtmlSource, HttpSource};
use super::{
    Browser, BrowserContext, BrowserError, BrowserResult, ContextConfig, ElementHandle,
    GotoOptions, Page,
};

pub struct StaticBrowser {
    source: Arc<dyn HtmlSource>,
}

impl StaticBrowser {
    pub fn new(source: Arc<dyn HtmlSource>) -> Self {
        Self { source }
    }

    pub fn http() -> Self {
        Self::new(Arc::new(HttpSource::new()))
    }

    pub fn browserless(base_url: &str, token: Option<&str>) -> Self {
        Self::new(Arc::new(BrowserlessSource::new(base_url, token)))
    }

    pub fn fixtures(fixtures: FixtureSource) -> Self {
        Self::new(Arc::new(fixtures))
    }
}

#[async_trait]
impl Browser for StaticBrowser {
    async fn new_context(&self, cfg: &ContextConfig) -> BrowserResult<Box<dyn BrowserContext>> {
        Ok(Box::new(StaticContext {
            source: Arc::clone(&self.source),
            cfg: cfg.clone(),
            closed: false,
        }))
    }
}

struct StaticContext {
    source: Arc<dyn HtmlSource>,
    cfg: ContextConfig,
    closed: bool,
}

#[async_trait]
impl BrowserContext for StaticContext {
    async fn new_page(&mut self) -> BrowserResult<Box<dyn Page>> {
        if self.closed {
            return Err(BrowserError::Context("context already closed".into()));
        }
        Ok(Box::new(StaticPage {
            source: Arc::clone(&self.source),
            cfg: self.cfg.clone(),
            url: None,
            html: None,
        }))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.closed = true;
        Ok(())
    }
}

struct StaticPage {
    source: Arc<dyn HtmlSource>,
    cfg: ContextConfig,
    url: Option<String>,
    html: Option<Arc<str>>,
}

impl StaticPage {
    fn document(&self) -> BrowserResult<&Arc<str>> {
        self.html.as_ref().ok_or(BrowserError::NotLoaded)
    }
}

#[async_trait]
impl Page for StaticPage {
    async fn goto(&mut self, url: &str, opts: GotoOptions) -> BrowserResult<()> {
        let fetched = tokio::time::timeout(opts.timeout, self.source.fetch(url, &self.cfg, opts))
            .await
            .map_err(|_| BrowserError::Timeout {
                what: format!("navigation to {url}"),
                after: opts.timeout,
            })??;
        self.url = Some(url.to_string());
        self.html = Some(Arc::from(fetched));
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn ElementHandle>>> {
        let found = select_in_document(self.document()?, selector)?;
        Ok(boxed(found))
    }

    async fn click(&mut self, selector: &str) -> BrowserResult<bool> {
        // No script runs here, so a click cannot change the snapshot.
        let found = !select_in_document(self.document()?, selector)?.is_empty();
        tracing::trace!(target: "browser", selector, found, "static click");
        Ok(found)
    }

    async fn fill(&mut self, _selector: &str, _value: &str) -> BrowserResult<()> {
        Err(BrowserError::Unsupported("fill"))
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.html = None;
        Ok(())
    }
}

/// Snapshot of one element. `ordinal` is its position among all elements of
/// `doc` in document order; nested queries re-parse `doc` and start there,
/// so the element keeps its real parent context (table rows included).
#[derive(Debug, Clone)]
struct StaticElement {
    doc: Arc<str>,
    ordinal: usize,
    text: String,
    lines: Vec<String>,
    attrs: HashMap<String, String>,
    visible: bool,
}

#[async_trait]
impl ElementHandle for StaticElement {
    async fn text(&self) -> BrowserResult<String> {
        Ok(self.text.clone())
    }

    async fn text_lines(&self) -> BrowserResult<Vec<String>> {
        Ok(self.lines.clone())
    }

    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        Ok(self.attrs.get(&name.to_ascii_lowercase()).cloned())
    }

    async fn is_visible(&self) -> BrowserResult<bool> {
        Ok(self.visible)
    }

    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn ElementHandle>>> {
        let found = select_within(self, selector)?;
        Ok(boxed(found))
    }
}

fn boxed(found: Vec<StaticElement>) -> Vec<Box<dyn ElementHandle>> {
    found
        .into_iter()
        .map(|e| Box::new(e) as Box<dyn ElementHandle>)
        .collect()
}

fn parse_selector(selector: &str) -> BrowserResult<Selector> {
    Selector::parse(selector).map_err(|e| BrowserError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn elements(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

fn select_in_document(html: &Arc<str>, selector: &str) -> BrowserResult<Vec<StaticElement>> {
    let sel = parse_selector(selector)?;
    let doc = Html::parse_document(html);
    let found = elements(&doc)
        .into_iter()
        .enumerate()
        .filter(|(_, e)| sel.matches(e))
        .map(|(i, e)| snapshot(html, i, e))
        .collect();
    Ok(found)
}

/// Descendants of `scope` matching `selector`, the scope itself excluded.
fn select_within(scope: &StaticElement, selector: &str) -> BrowserResult<Vec<StaticElement>> {
    let sel = parse_selector(selector)?;
    let doc = Html::parse_document(&scope.doc);
    let all = elements(&doc);
    let Some(root) = all.get(scope.ordinal) else {
        return Ok(Vec::new());
    };
    // Descendants are contiguous in document order.
    let size = root.descendants().filter_map(ElementRef::wrap).count();
    let first = scope.ordinal + 1;
    let last = (scope.ordinal + size).min(all.len());
    let found = (first..last)
        .filter(|&i| sel.matches(&all[i]))
        .map(|i| snapshot(&scope.doc, i, all[i]))
        .collect();
    Ok(found)
}

fn snapshot(doc: &Arc<str>, ordinal: usize, el: ElementRef<'_>) -> StaticElement {
    let lines = el
        .text()
        .flat_map(|t| t.lines())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();

    let attrs = el
        .value()
        .attrs()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect();

    let hidden = std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|e| is_hidden(&e));

    StaticElement {
        doc: Arc::clone(doc),
        ordinal,
        text: el.text().collect(),
        lines,
        attrs,
        visible: !hidden,
    }
}

fn is_hidden(el: &ElementRef<'_>) -> bool {
    let v = el.value();
    if v.attr("hidden").is_some() || v.attr("aria-hidden") == Some("true") {
        return true;
    }
    v.attr("style")
        .map(|s| {
            let s: String = s.to_ascii_lowercase().split_whitespace().collect();
            s.contains("display:none") || s.contains("visibility:hidden")
        })
        .unwrap_or(false)
}
