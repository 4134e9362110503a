// src/sources/mod.rs
//! Source adapters: one per career site.
//!
//! Every site follows the same pipeline shape (navigate, dismiss consent,
//! locate cards, optionally paginate, extract each card), so a site is a
//! declarative [`SiteProfile`] driven by [`ListingAdapter`]. Anything that
//! does not fit the shape can implement [`SourceAdapter`] directly.

pub mod apple;
pub mod bmw;
pub mod glassdoor;
pub mod google;
pub mod indeed;
pub mod linkedin;
pub mod microsoft;
pub mod stepstone;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::{counter, histogram};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::browser::{
    BrowserContext, ContextConfig, ElementHandle, GotoOptions, Page, WaitUntil, CLOSE_WAIT,
};
use crate::config::HarvesterConfig;
use crate::extract::{extract_field, extract_field_excluding, FieldChain, FieldKind};
use crate::filter::SearchScope;
use crate::normalize::{canonical_url, parse_posted_date};
use crate::types::{Posting, SourceOutcome, SourceResult, UNKNOWN_COMPANY};

/// Bounded wait per candidate listing selector.
pub const LISTING_WAIT: Duration = Duration::from_secs(3);
/// Bounded wait per consent button candidate.
pub const CONSENT_WAIT: Duration = Duration::from_secs(1);
/// Bounded time for extracting one card.
pub const ITEM_BUDGET: Duration = Duration::from_secs(10);

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Name recorded as `Posting::source`.
    fn name(&self) -> &str;

    /// Context identity for this site, derived from the run-wide default.
    fn context_config(&self, base: &ContextConfig) -> ContextConfig {
        base.clone()
    }

    /// Scrape one run on a context owned by the caller. Recoverable failures
    /// come back as an `Ok` result with a non-complete outcome.
    async fn scrape(&self, ctx: &mut dyn BrowserContext) -> Result<SourceResult>;
}

/// Best-effort "more results" strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    None,
    /// Click a button that appends cards to the current page.
    LoadMore { button: &'static str },
    /// Follow an anchor to the next results page.
    NextLink { anchor: &'static str },
}

/// Declarative description of one career site.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub name: &'static str,
    pub search_url: String,
    /// Base for resolving relative card links.
    pub base_url: &'static str,
    pub goto: GotoOptions,
    pub accept_language: Option<&'static str>,
    pub consent: &'static [&'static str],
    /// Candidate card selectors; the first that matches anything wins.
    pub listing: &'static [&'static str],
    pub pagination: Pagination,
    pub extra_pages: usize,
    pub max_items: usize,
    pub title: FieldChain,
    pub url: FieldChain,
    pub company: FieldChain,
    /// Company career sites always post for themselves.
    pub fixed_company: Option<&'static str>,
    pub location: FieldChain,
    pub posted: FieldChain,
    /// Canonical URLs not matching this are dropped.
    pub url_pattern: Option<&'static str>,
}

impl SiteProfile {
    /// Defaults shared by most sites; callers fill in the selectors.
    pub fn new(name: &'static str, search_url: String, base_url: &'static str) -> Self {
        Self {
            name,
            search_url,
            base_url,
            goto: GotoOptions {
                wait_until: WaitUntil::DomContentLoaded,
                timeout: Duration::from_secs(20),
            },
            accept_language: None,
            consent: &[],
            listing: &[],
            pagination: Pagination::None,
            extra_pages: 0,
            max_items: 20,
            title: FieldChain::default(),
            url: FieldChain::default(),
            company: FieldChain::default(),
            fixed_company: None,
            location: FieldChain::default(),
            posted: FieldChain::default(),
            url_pattern: None,
        }
    }
}

/// Why a card was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    Hidden,
    NoTitle,
    NoUrl,
    Irrelevant,
    OutOfArea,
    UrlPattern,
    Duplicate,
}

impl Skip {
    pub fn as_str(&self) -> &'static str {
        match self {
            Skip::Hidden => "hidden",
            Skip::NoTitle => "no_title",
            Skip::NoUrl => "no_url",
            Skip::Irrelevant => "irrelevant",
            Skip::OutOfArea => "out_of_area",
            Skip::UrlPattern => "url_pattern",
            Skip::Duplicate => "duplicate",
        }
    }
}

/// Drives a [`SiteProfile`] through the listing pipeline.
pub struct ListingAdapter {
    profile: SiteProfile,
    scope: Arc<SearchScope>,
    url_pattern: Option<Regex>,
}

impl ListingAdapter {
    pub fn new(profile: SiteProfile, scope: Arc<SearchScope>) -> Self {
        let url_pattern = profile.url_pattern.and_then(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(target: "scrape", source = profile.name, error = %e, "ignoring invalid url pattern");
                None
            }
        });
        Self {
            profile,
            scope,
            url_pattern,
        }
    }

    async fn scrape_page(&self, page: &mut dyn Page) -> SourceResult {
        let p = &self.profile;
        let started = Instant::now();

        if let Err(e) = page.goto(&p.search_url, p.goto).await {
            warn!(target: "scrape", source = p.name, url = %p.search_url, error = %e, "navigation failed");
            return SourceResult::empty(p.name, SourceOutcome::NavigationFailed(e.to_string()));
        }

        self.dismiss_consent(page).await;

        let Some((selector, mut cards)) = self.locate_cards(page).await else {
            warn!(target: "scrape", source = p.name, "no listing selector matched");
            return SourceResult::empty(p.name, SourceOutcome::NoListings);
        };
        info!(target: "scrape", source = p.name, selector, found = cards.len(), "located job cards");

        self.paginate(page, selector, &mut cards).await;

        let today = Utc::now().date_naive();
        let mut seen = HashSet::new();
        let mut postings = Vec::new();

        for (idx, card) in cards.iter().take(p.max_items).enumerate() {
            match tokio::time::timeout(ITEM_BUDGET, self.extract_card(card.as_ref(), today)).await {
                Ok(Ok(posting)) => {
                    if seen.insert(posting.url.clone()) {
                        debug!(target: "scrape", source = p.name, title = %posting.title, "extracted");
                        postings.push(posting);
                    } else {
                        self.record_skip(Skip::Duplicate);
                    }
                }
                Ok(Err(skip)) => {
                    debug!(target: "scrape", source = p.name, idx, reason = skip.as_str(), "card skipped");
                    self.record_skip(skip);
                }
                Err(_) => {
                    warn!(target: "scrape", source = p.name, idx, "card extraction timed out");
                }
            }
        }

        let ms = started.elapsed().as_secs_f64() * 1_000.0;
        histogram!("scrape_source_duration_ms", "source" => p.name).record(ms);
        counter!("scrape_postings_total", "source" => p.name).increment(postings.len() as u64);
        info!(target: "scrape", source = p.name, relevant = postings.len(), "source scraped");

        SourceResult {
            source: p.name.to_string(),
            postings,
            outcome: SourceOutcome::Complete,
        }
    }

    async fn dismiss_consent(&self, page: &mut dyn Page) {
        for selector in self.profile.consent {
            match tokio::time::timeout(CONSENT_WAIT, page.click(selector)).await {
                Ok(Ok(true)) => {
                    debug!(target: "scrape", source = self.profile.name, selector, "consent dismissed");
                    return;
                }
                Ok(Ok(false)) | Err(_) => {}
                Ok(Err(e)) => debug!(target: "scrape", source = self.profile.name, selector, error = %e, "consent click failed"),
            }
        }
    }

    async fn locate_cards(&self, page: &dyn Page) -> Option<(&'static str, Vec<Box<dyn ElementHandle>>)> {
        for &selector in self.profile.listing {
            match tokio::time::timeout(LISTING_WAIT, page.query_all(selector)).await {
                Ok(Ok(cards)) if !cards.is_empty() => return Some((selector, cards)),
                Ok(Ok(_)) | Err(_) => {
                    debug!(target: "scrape", source = self.profile.name, selector, "listing selector missed")
                }
                Ok(Err(e)) => {
                    debug!(target: "scrape", source = self.profile.name, selector, error = %e, "listing selector failed")
                }
            }
        }
        None
    }

    async fn paginate(&self, page: &mut dyn Page, selector: &str, cards: &mut Vec<Box<dyn ElementHandle>>) {
        let p = &self.profile;
        for _ in 0..p.extra_pages {
            if cards.len() >= p.max_items {
                return;
            }
            let grown = match p.pagination {
                Pagination::None => return,
                Pagination::LoadMore { button } => self.load_more(page, button, selector, cards).await,
                Pagination::NextLink { anchor } => self.next_page(page, anchor, selector, cards).await,
            };
            if !grown {
                return;
            }
        }
    }

    async fn load_more(
        &self,
        page: &mut dyn Page,
        button: &str,
        selector: &str,
        cards: &mut Vec<Box<dyn ElementHandle>>,
    ) -> bool {
        if !matches!(tokio::time::timeout(LISTING_WAIT, page.click(button)).await, Ok(Ok(true))) {
            return false;
        }
        match tokio::time::timeout(LISTING_WAIT, page.query_all(selector)).await {
            Ok(Ok(more)) if more.len() > cards.len() => {
                info!(target: "scrape", source = self.profile.name, total = more.len(), "loaded more cards");
                *cards = more;
                true
            }
            _ => false,
        }
    }

    async fn next_page(
        &self,
        page: &mut dyn Page,
        anchor: &str,
        selector: &str,
        cards: &mut Vec<Box<dyn ElementHandle>>,
    ) -> bool {
        let href = match tokio::time::timeout(LISTING_WAIT, page.query_all(anchor)).await {
            Ok(Ok(links)) => match links.first() {
                Some(link) => link.attribute("href").await.ok().flatten(),
                None => None,
            },
            _ => None,
        };
        let base = page.url().unwrap_or(self.profile.base_url).to_string();
        let Some(next) = href.and_then(|h| canonical_url(&base, &h)) else {
            return false;
        };

        if let Err(e) = page.goto(&next, self.profile.goto).await {
            debug!(target: "scrape", source = self.profile.name, url = %next, error = %e, "next page failed");
            return false;
        }
        match tokio::time::timeout(LISTING_WAIT, page.query_all(selector)).await {
            Ok(Ok(more)) if !more.is_empty() => {
                info!(target: "scrape", source = self.profile.name, added = more.len(), "followed next page");
                cards.extend(more);
                true
            }
            _ => false,
        }
    }

    /// Card checks and field extraction, cheapest rejection first.
    async fn extract_card(&self, card: &dyn ElementHandle, today: NaiveDate) -> Result<Posting, Skip> {
        let p = &self.profile;

        if !card.is_visible().await.unwrap_or(true) {
            return Err(Skip::Hidden);
        }

        let title = extract_field(card, FieldKind::Title, &p.title)
            .await
            .ok_or(Skip::NoTitle)?;
        let href = extract_field(card, FieldKind::Url, &p.url)
            .await
            .ok_or(Skip::NoUrl)?;

        if !self.scope.accepts_title(&title) {
            return Err(Skip::Irrelevant);
        }

        let company = match p.fixed_company {
            Some(c) => c.to_string(),
            None => extract_field_excluding(card, FieldKind::Company, &p.company, &[title.clone()])
                .await
                .unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
        };
        let location = extract_field(card, FieldKind::Location, &p.location)
            .await
            .unwrap_or_default();
        let posted_date = extract_field(card, FieldKind::PostedDate, &p.posted)
            .await
            .and_then(|t| parse_posted_date(&t, today))
            .unwrap_or(today);

        if !location.is_empty() && !self.scope.accepts_location(&location) {
            return Err(Skip::OutOfArea);
        }

        let url = canonical_url(p.base_url, &href).ok_or(Skip::NoUrl)?;
        if let Some(re) = &self.url_pattern {
            if !re.is_match(&url) {
                return Err(Skip::UrlPattern);
            }
        }

        let location = if location.is_empty() {
            self.scope.location.clone()
        } else {
            location
        };

        Ok(Posting {
            title,
            company,
            location,
            url,
            description: String::new(),
            posted_date,
            source: p.name.to_string(),
        })
    }

    fn record_skip(&self, skip: Skip) {
        counter!(
            "scrape_items_skipped_total",
            "source" => self.profile.name,
            "reason" => skip.as_str()
        )
        .increment(1);
    }
}

#[async_trait]
impl SourceAdapter for ListingAdapter {
    fn name(&self) -> &str {
        self.profile.name
    }

    fn context_config(&self, base: &ContextConfig) -> ContextConfig {
        let mut cfg = base.clone();
        if let Some(lang) = self.profile.accept_language {
            cfg.accept_language = lang.to_string();
        }
        cfg
    }

    async fn scrape(&self, ctx: &mut dyn BrowserContext) -> Result<SourceResult> {
        let mut page = ctx
            .new_page()
            .await
            .with_context(|| format!("{}: open page", self.profile.name))?;

        let result = self.scrape_page(page.as_mut()).await;

        match tokio::time::timeout(CLOSE_WAIT, page.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(target: "scrape", source = self.profile.name, error = %e, "page close failed"),
            Err(_) => warn!(target: "scrape", source = self.profile.name, after = ?CLOSE_WAIT, "page close timed out"),
        }
        Ok(result)
    }
}

/// Every site this crate knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    LinkedIn,
    StepStone,
    Indeed,
    Glassdoor,
    GoogleCareers,
    Bmw,
    Microsoft,
    Apple,
}

impl SourceId {
    pub const ALL: [SourceId; 8] = [
        SourceId::LinkedIn,
        SourceId::StepStone,
        SourceId::Indeed,
        SourceId::Glassdoor,
        SourceId::GoogleCareers,
        SourceId::Bmw,
        SourceId::Microsoft,
        SourceId::Apple,
    ];

    /// Config key.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::LinkedIn => "linkedin",
            SourceId::StepStone => "stepstone",
            SourceId::Indeed => "indeed",
            SourceId::Glassdoor => "glassdoor",
            SourceId::GoogleCareers => "google",
            SourceId::Bmw => "bmw",
            SourceId::Microsoft => "microsoft",
            SourceId::Apple => "apple",
        }
    }

    /// Indeed and Glassdoor sit behind aggressive bot walls and are opt-in.
    pub fn enabled_by_default(&self) -> bool {
        !matches!(self, SourceId::Indeed | SourceId::Glassdoor)
    }

    pub fn profile(&self, scope: &SearchScope) -> SiteProfile {
        match self {
            SourceId::LinkedIn => linkedin::profile(scope),
            SourceId::StepStone => stepstone::profile(scope),
            SourceId::Indeed => indeed::profile(scope),
            SourceId::Glassdoor => glassdoor::profile(scope),
            SourceId::GoogleCareers => google::profile(scope),
            SourceId::Bmw => bmw::profile(scope),
            SourceId::Microsoft => microsoft::profile(scope),
            SourceId::Apple => apple::profile(scope),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        SourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == key)
            .or(match key.as_str() {
                "googlecareers" => Some(SourceId::GoogleCareers),
                "bmwgroup" => Some(SourceId::Bmw),
                _ => None,
            })
            .ok_or_else(|| anyhow::anyhow!("unknown source `{s}`"))
    }
}

/// Adapters for every enabled source, with per-source overrides applied.
pub fn build_adapters(cfg: &HarvesterConfig) -> Vec<Arc<dyn SourceAdapter>> {
    let scope = Arc::new(cfg.scope());
    cfg.enabled_sources()
        .into_iter()
        .map(|id| {
            let mut profile = id.profile(&scope);
            if let Some(n) = cfg.max_items(id) {
                profile.max_items = n.max(1);
            }
            if let Some(t) = cfg.navigation_timeout() {
                profile.goto.timeout = t;
            }
            Arc::new(ListingAdapter::new(profile, Arc::clone(&scope))) as Arc<dyn SourceAdapter>
        })
        .collect()
}

/// Percent-encode a query component.
pub(crate) fn encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ids_round_trip_through_config_keys() {
        for id in SourceId::ALL {
            assert_eq!(id.as_str().parse::<SourceId>().unwrap(), id);
        }
        assert_eq!("Google-Careers".parse::<SourceId>().unwrap(), SourceId::GoogleCareers);
        assert!("monster".parse::<SourceId>().is_err());
    }

    #[test]
    fn every_profile_has_listing_and_title_chains() {
        let scope = SearchScope::default();
        for id in SourceId::ALL {
            let p = id.profile(&scope);
            assert!(!p.listing.is_empty(), "{id} has no listing selectors");
            assert!(!p.title.is_empty(), "{id} has no title chain");
            assert!(!p.url.is_empty(), "{id} has no url chain");
            assert!(p.max_items > 0 && p.max_items <= 50);
            assert!(p.extra_pages <= 2);
            assert!(p.search_url.starts_with("https://"));
            assert!(p.goto.timeout <= Duration::from_secs(30));
        }
    }

    #[test]
    fn build_adapters_honours_overrides() {
        let mut cfg = HarvesterConfig::default();
        cfg.sources.insert(
            "linkedin".into(),
            crate::config::SourceConfig {
                enabled: Some(true),
                max_items: Some(7),
            },
        );
        cfg.sources.insert(
            "apple".into(),
            crate::config::SourceConfig {
                enabled: Some(false),
                max_items: None,
            },
        );
        let adapters = build_adapters(&cfg);
        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"LinkedIn"));
        assert!(!names.contains(&"Apple Careers"));
    }

    #[test]
    fn encode_spaces_and_umlauts() {
        assert_eq!(encode("software engineer"), "software+engineer");
        assert_eq!(encode("München"), "M%C3%BCnchen");
    }
}
