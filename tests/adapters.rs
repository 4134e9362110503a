// tests/adapters.rs
use async_trait::async_trait;
use chrono::{Duration, Utc};
use job_harvester::browser::{
    Browser, BrowserContext, BrowserError, BrowserResult, ContextConfig, ElementHandle, FixtureSource,
    GotoOptions, Page, StaticBrowser,
};
use job_harvester::filter::SearchScope;
use job_harvester::sources::{
    apple, indeed, linkedin, microsoft, stepstone, ListingAdapter, SiteProfile, SourceAdapter, SourceId,
};
use job_harvester::types::UNKNOWN_COMPANY;
use job_harvester::{SourceOutcome, SourceResult};
use std::fs;
use std::sync::Arc;

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{name}")).unwrap_or_else(|_| panic!("missing tests/fixtures/{name}"))
}

async fn scrape(id: SourceId, pages: FixtureSource) -> SourceResult {
    let scope = SearchScope::default();
    scrape_profile(id.profile(&scope), &StaticBrowser::fixtures(pages)).await
}

async fn scrape_profile(profile: SiteProfile, browser: &dyn Browser) -> SourceResult {
    let adapter = ListingAdapter::new(profile, Arc::new(SearchScope::default()));
    let mut ctx = browser
        .new_context(&adapter.context_config(&ContextConfig::default()))
        .await
        .expect("context");
    let result = adapter.scrape(ctx.as_mut()).await.expect("adapter never errors on bad pages");
    ctx.close().await.expect("close");
    result
}

#[tokio::test]
async fn linkedin_fixture_keeps_relevant_local_cards_only() {
    let scope = SearchScope::default();
    let pages = FixtureSource::new().with_page(linkedin::search_url(&scope), fixture("linkedin_search.html"));
    let result = scrape(SourceId::LinkedIn, pages).await;

    assert_eq!(result.outcome, SourceOutcome::Complete);
    assert_eq!(result.source, "LinkedIn");
    let urls: Vec<&str> = result.postings.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://de.linkedin.com/jobs/view/rust-software-engineer-at-acme-3812345678",
            "https://www.linkedin.com/jobs/view/devops-engineer-3833333333",
        ]
    );

    let rust = &result.postings[0];
    assert_eq!(rust.title, "Rust Software Engineer");
    assert_eq!(rust.company, "ACME GmbH");
    assert_eq!(rust.location, "Munich, Bavaria, Germany");
    assert_eq!(rust.posted_date.to_string(), "2025-03-10");

    // No location on the card: search location, undated: today.
    let devops = &result.postings[1];
    assert_eq!(devops.company, "Cloudy & Co");
    assert_eq!(devops.location, "Munich");
    assert_eq!(devops.posted_date, Utc::now().date_naive());

    assert!(result.postings.iter().all(|p| p.is_well_formed()));
}

#[tokio::test]
async fn stepstone_uses_later_listing_selector_and_content_company_fallback() {
    let scope = SearchScope::default();
    let pages = FixtureSource::new().with_page(stepstone::search_url(&scope), fixture("stepstone_search.html"));
    let result = scrape(SourceId::StepStone, pages).await;

    assert_eq!(result.outcome, SourceOutcome::Complete);
    assert_eq!(result.postings.len(), 2);

    let first = &result.postings[0];
    assert_eq!(first.title, "Softwareentwickler Java (m/w/d)");
    assert_eq!(first.company, "Bayerische Softwarehaus");
    assert_eq!(first.location, "München");
    assert!(first
        .url
        .starts_with("https://www.stepstone.de/stellenangebote--Softwareentwickler-Java"));
    assert_eq!(first.posted_date, Utc::now().date_naive() - Duration::days(2));

    let second = &result.postings[1];
    assert_eq!(second.company, "Siemens AG");
    assert_eq!(second.location, "München, Garching");
}

#[tokio::test]
async fn microsoft_synthesizes_urls_from_job_ids() {
    let scope = SearchScope::default();
    let pages = FixtureSource::new().with_page(microsoft::search_url(&scope), fixture("microsoft_search.html"));
    let result = scrape(SourceId::Microsoft, pages).await;

    let got: Vec<(&str, &str)> = result
        .postings
        .iter()
        .map(|p| (p.title.as_str(), p.url.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("Software Engineer II", "https://jobs.careers.microsoft.com/global/en/job/1712345"),
            (
                "Senior Software Engineer - Azure",
                "https://jobs.careers.microsoft.com/global/en/job/1798765"
            ),
            (
                "Cloud Solution Engineer",
                "https://jobs.careers.microsoft.com/global/en/job/1700001/Cloud-Solution-Engineer"
            ),
        ]
    );
    assert!(result.postings.iter().all(|p| p.company == "Microsoft"));
    assert_eq!(result.postings[0].posted_date, Utc::now().date_naive() - Duration::days(12));
}

#[tokio::test]
async fn zero_matching_listing_selectors_yield_empty_result() {
    let scope = SearchScope::default();
    let pages = FixtureSource::new().with_page(linkedin::search_url(&scope), fixture("no_listings.html"));
    let result = scrape(SourceId::LinkedIn, pages).await;

    assert!(result.postings.is_empty());
    assert_eq!(result.outcome, SourceOutcome::NoListings);
}

#[tokio::test]
async fn navigation_failure_is_an_empty_result() {
    // Nothing registered: every navigation is a 404.
    let result = scrape(SourceId::StepStone, FixtureSource::new()).await;

    assert!(result.postings.is_empty());
    assert!(matches!(result.outcome, SourceOutcome::NavigationFailed(ref e) if e.contains("404")));
}

#[tokio::test]
async fn unknown_company_sentinel_when_nothing_matches() {
    let scope = SearchScope::default();
    let html = r#"<html><body>
        <div class="job-search-card">
          <a class="base-card__full-link" href="https://de.linkedin.com/jobs/view/x-1"></a>
          <h3 class="base-search-card__title">Software Engineer</h3>
        </div></body></html>"#;
    let pages = FixtureSource::new().with_page(linkedin::search_url(&scope), html);
    let result = scrape(SourceId::LinkedIn, pages).await;

    assert_eq!(result.postings.len(), 1);
    assert_eq!(result.postings[0].company, UNKNOWN_COMPANY);
}

#[tokio::test]
async fn absurd_relative_date_falls_back_to_today_without_losing_siblings() {
    let scope = SearchScope::default();
    let html = r#"<html><body>
        <article data-at="job-item">
          <h2><a href="/stellenangebote--Rust-Engineer--1-inline.html">Rust Engineer (m/w/d)</a></h2>
          <span data-at="job-item-company-name">Ferris GmbH</span>
          <span data-at="job-item-location">München</span>
          <span data-at="job-item-timeago">vor 99999999 Tagen</span>
        </article>
        <article data-at="job-item">
          <h2><a href="/stellenangebote--Backend-Developer--2-inline.html">Backend Developer (m/w/d)</a></h2>
          <span data-at="job-item-company-name">Isar Tech AG</span>
          <span data-at="job-item-location">München</span>
          <span data-at="job-item-timeago">vor 3 Tagen</span>
        </article>
        </body></html>"#;
    let pages = FixtureSource::new().with_page(stepstone::search_url(&scope), html);
    let result = scrape(SourceId::StepStone, pages).await;

    assert_eq!(result.outcome, SourceOutcome::Complete);
    assert_eq!(result.postings.len(), 2);
    let today = Utc::now().date_naive();
    assert_eq!(result.postings[0].company, "Ferris GmbH");
    assert_eq!(result.postings[0].posted_date, today);
    assert_eq!(result.postings[1].posted_date, today - Duration::days(3));
}

const APPLE_TABLE: &str = r#"<html><body>
    <table id="tblResultSet">
      <tbody id="accordion_200556">
        <tr>
          <td><h3><a href="/en-us/details/200556/software-engineer-maps">Software Engineer, Maps</a></h3></td>
          <td><span class="table--advanced-search__location-sub">Berlin</span></td>
        </tr>
      </tbody>
      <tbody id="accordion_200557">
        <tr>
          <td><h3><a href="/en-us/details/200557/ios-engineer">iOS Engineer</a></h3></td>
          <td><span class="table--advanced-search__location-sub">Munich</span></td>
        </tr>
      </tbody>
    </table>
    </body></html>"#;

#[tokio::test]
async fn table_row_cards_keep_their_cells() {
    let scope = SearchScope::default();
    let pages = FixtureSource::new().with_page(apple::search_url(&scope), APPLE_TABLE);
    let result = scrape(SourceId::Apple, pages).await;

    // The Berlin row must be judged by its own location, not the search one.
    assert_eq!(result.outcome, SourceOutcome::Complete);
    assert_eq!(result.postings.len(), 1);
    let job = &result.postings[0];
    assert_eq!(job.title, "iOS Engineer");
    assert_eq!(job.location, "Munich");
    assert_eq!(job.company, "Apple");
    assert_eq!(job.url, "https://jobs.apple.com/en-us/details/200557/ios-engineer");
}

fn indeed_card(jk: &str, title: &str) -> String {
    format!(
        r#"<div class="job_seen_beacon">
             <h2 class="jobTitle"><a href="/viewjob?jk={jk}"><span title="{title}">{title}</span></a></h2>
             <span data-testid="company-name">ACME {jk}</span>
             <div data-testid="text-location">München</div>
           </div>"#
    )
}

fn indeed_pages() -> FixtureSource {
    let scope = SearchScope::default();
    let first = format!(
        r#"<html><body>{}{}<nav><a data-testid="pagination-page-next" href="/jobs?q=software+engineer&amp;start=10">Next</a></nav></body></html>"#,
        indeed_card("a1", "Rust Engineer"),
        indeed_card("a2", "Backend Developer"),
    );
    let second = format!(
        "<html><body>{}{}</body></html>",
        indeed_card("b1", "Platform Engineer"),
        indeed_card("b2", "Frontend Developer"),
    );
    FixtureSource::new()
        .with_page(indeed::search_url(&scope), first)
        .with_page("https://de.indeed.com/jobs?q=software+engineer&start=10", second)
}

#[tokio::test]
async fn next_link_pagination_merges_the_second_page() {
    let result = scrape(SourceId::Indeed, indeed_pages()).await;

    assert_eq!(result.outcome, SourceOutcome::Complete);
    let titles: Vec<&str> = result.postings.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Rust Engineer", "Backend Developer", "Platform Engineer", "Frontend Developer"]
    );
    assert_eq!(result.postings[2].url, "https://de.indeed.com/viewjob?jk=b1");
    assert_eq!(result.postings[2].company, "ACME b1");
}

#[tokio::test]
async fn next_link_pagination_respects_max_items() {
    let mut profile = indeed::profile(&SearchScope::default());
    profile.max_items = 3;
    let result = scrape_profile(profile, &StaticBrowser::fixtures(indeed_pages())).await;

    assert_eq!(result.postings.len(), 3);
    assert_eq!(result.postings[2].title, "Platform Engineer");
}

#[tokio::test]
async fn next_link_to_a_missing_page_keeps_the_first_page() {
    let scope = SearchScope::default();
    let first = format!(
        r#"<html><body>{}<a data-testid="pagination-page-next" href="/jobs?start=10">Next</a></body></html>"#,
        indeed_card("a1", "Rust Engineer"),
    );
    let pages = FixtureSource::new().with_page(indeed::search_url(&scope), first);
    let result = scrape(SourceId::Indeed, pages).await;

    assert_eq!(result.outcome, SourceOutcome::Complete);
    assert_eq!(result.postings.len(), 1);
}

#[tokio::test]
async fn load_more_without_growth_keeps_the_first_page() {
    let scope = SearchScope::default();
    let mut profile = linkedin::profile(&scope);
    profile.extra_pages = 3;
    let pages = FixtureSource::new().with_page(linkedin::search_url(&scope), fixture("linkedin_search.html"));
    let result = scrape_profile(profile, &StaticBrowser::fixtures(pages)).await;

    assert_eq!(result.outcome, SourceOutcome::Complete);
    let urls: Vec<&str> = result.postings.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://de.linkedin.com/jobs/view/rust-software-engineer-at-acme-3812345678",
            "https://www.linkedin.com/jobs/view/devops-engineer-3833333333",
        ]
    );
}

/// Wraps the static engine; cards whose text mentions `BROKEN` fail every
/// lookup and cards mentioning `STUCK` never answer a visibility check.
struct FaultyBrowser {
    inner: StaticBrowser,
    hang_on_close: bool,
}

struct FaultyContext {
    inner: Box<dyn BrowserContext>,
    hang_on_close: bool,
}

struct FaultyPage {
    inner: Box<dyn Page>,
    hang_on_close: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fault {
    Error,
    Hang,
}

struct FaultyCard {
    inner: Box<dyn ElementHandle>,
    fault: Option<Fault>,
}

impl FaultyCard {
    fn check(&self) -> BrowserResult<()> {
        match self.fault {
            Some(Fault::Error) => Err(BrowserError::Network("connection reset".into())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Browser for FaultyBrowser {
    async fn new_context(&self, cfg: &ContextConfig) -> BrowserResult<Box<dyn BrowserContext>> {
        Ok(Box::new(FaultyContext {
            inner: self.inner.new_context(cfg).await?,
            hang_on_close: self.hang_on_close,
        }))
    }
}

#[async_trait]
impl BrowserContext for FaultyContext {
    async fn new_page(&mut self) -> BrowserResult<Box<dyn Page>> {
        Ok(Box::new(FaultyPage {
            inner: self.inner.new_page().await?,
            hang_on_close: self.hang_on_close,
        }))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.inner.close().await
    }
}

#[async_trait]
impl Page for FaultyPage {
    async fn goto(&mut self, url: &str, opts: GotoOptions) -> BrowserResult<()> {
        self.inner.goto(url, opts).await
    }

    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn ElementHandle>>> {
        let mut out: Vec<Box<dyn ElementHandle>> = Vec::new();
        for el in self.inner.query_all(selector).await? {
            let text = el.text().await?;
            let fault = if text.contains("BROKEN") {
                Some(Fault::Error)
            } else if text.contains("STUCK") {
                Some(Fault::Hang)
            } else {
                None
            };
            out.push(Box::new(FaultyCard { inner: el, fault }));
        }
        Ok(out)
    }

    async fn click(&mut self, selector: &str) -> BrowserResult<bool> {
        self.inner.click(selector).await
    }

    async fn fill(&mut self, selector: &str, value: &str) -> BrowserResult<()> {
        self.inner.fill(selector, value).await
    }

    fn url(&self) -> Option<&str> {
        self.inner.url()
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if self.hang_on_close {
            std::future::pending::<()>().await;
        }
        self.inner.close().await
    }
}

#[async_trait]
impl ElementHandle for FaultyCard {
    async fn text(&self) -> BrowserResult<String> {
        self.inner.text().await
    }

    async fn text_lines(&self) -> BrowserResult<Vec<String>> {
        self.check()?;
        self.inner.text_lines().await
    }

    async fn attribute(&self, name: &str) -> BrowserResult<Option<String>> {
        self.check()?;
        self.inner.attribute(name).await
    }

    async fn is_visible(&self) -> BrowserResult<bool> {
        if self.fault == Some(Fault::Hang) {
            std::future::pending::<()>().await;
        }
        self.inner.is_visible().await
    }

    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<Box<dyn ElementHandle>>> {
        self.check()?;
        self.inner.query_all(selector).await
    }
}

fn stepstone_card(slug: &str, title: &str, extra: &str) -> String {
    format!(
        r#"<article data-at="job-item">
             <h2><a href="/stellenangebote--{slug}-inline.html">{title}</a></h2>
             <span data-at="job-item-company-name">Isar Tech AG</span>
             <span data-at="job-item-location">München</span>
             {extra}
           </article>"#
    )
}

fn faulty_stepstone(hang_on_close: bool) -> FaultyBrowser {
    let scope = SearchScope::default();
    let html = format!(
        "<html><body>{}{}{}{}</body></html>",
        stepstone_card("Rust-Engineer--1", "Rust Engineer", ""),
        stepstone_card("Java-Developer--2", "Java Developer", "<span>BROKEN</span>"),
        stepstone_card("Go-Developer--3", "Go Developer", "<span>STUCK</span>"),
        stepstone_card("Backend-Developer--4", "Backend Developer", ""),
    );
    FaultyBrowser {
        inner: StaticBrowser::fixtures(FixtureSource::new().with_page(stepstone::search_url(&scope), html)),
        hang_on_close,
    }
}

#[tokio::test(start_paused = true)]
async fn failing_and_stuck_cards_do_not_stop_their_siblings() {
    let scope = SearchScope::default();
    let result = scrape_profile(stepstone::profile(&scope), &faulty_stepstone(false)).await;

    assert_eq!(result.outcome, SourceOutcome::Complete);
    let titles: Vec<&str> = result.postings.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Rust Engineer", "Backend Developer"]);
}

#[tokio::test(start_paused = true)]
async fn page_close_that_never_returns_does_not_block_the_result() {
    let scope = SearchScope::default();
    let adapter = ListingAdapter::new(stepstone::profile(&scope), Arc::new(scope));
    let browser = faulty_stepstone(true);
    let mut ctx = browser.new_context(&ContextConfig::default()).await.unwrap();

    let result = tokio::time::timeout(std::time::Duration::from_secs(60), adapter.scrape(ctx.as_mut()))
        .await
        .expect("page close is bounded")
        .unwrap();

    assert_eq!(result.postings.len(), 2);
}
