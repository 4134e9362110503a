// src/sources/indeed.rs
//! Indeed Germany, newest first, last seven days. Behind Cloudflare and
//! therefore disabled unless enabled in config.

use super::{encode, Pagination, SiteProfile};
use crate::extract::{FieldChain, Locator};
use crate::filter::SearchScope;

static TITLE: &[Locator] = &[
    Locator::Attr("h2 a span[title]", "title"),
    Locator::Text("h2 a"),
    Locator::Text(".jobTitle a span"),
    Locator::Text("[data-testid=\"job-title\"] a"),
];

static URL: &[Locator] = &[
    Locator::Attr("h2 a", "href"),
    Locator::Attr(".jobTitle a", "href"),
    Locator::Attr("[data-testid=\"job-title\"] a", "href"),
    Locator::Capture {
        css: "a[data-jk]",
        attr: "data-jk",
        pattern: r"^([0-9a-f]+)$",
        template: "https://de.indeed.com/viewjob?jk={1}",
    },
];

static COMPANY: &[Locator] = &[
    Locator::Text("[data-testid=\"company-name\"]"),
    Locator::Text(".companyName a"),
    Locator::Text(".companyName span"),
    Locator::Text(".companyName"),
];

static LOCATION: &[Locator] = &[
    Locator::Text("[data-testid=\"text-location\"]"),
    Locator::Text("[data-testid=\"job-location\"]"),
    Locator::Text(".companyLocation"),
];

static POSTED: &[Locator] = &[
    Locator::Text("[data-testid=\"myJobsStateDate\"]"),
    Locator::Text("span.date"),
];

pub fn search_url(scope: &SearchScope) -> String {
    format!(
        "https://de.indeed.com/jobs?q={}&l={}&sort=date&fromage=7",
        encode(scope.primary_keyword()),
        encode(&scope.location),
    )
}

pub fn profile(scope: &SearchScope) -> SiteProfile {
    let mut p = SiteProfile::new("Indeed", search_url(scope), "https://de.indeed.com");
    p.accept_language = Some("en-US,en;q=0.5");
    p.consent = &["#onetrust-accept-btn-handler", "button[id*=\"accept\"]", "button[class*=\"accept\"]"];
    p.listing = &[".job_seen_beacon", "[data-testid=\"job-card\"]", ".jobsearch-SerpJobCard"];
    p.pagination = Pagination::NextLink {
        anchor: "a[data-testid=\"pagination-page-next\"]",
    };
    p.extra_pages = 1;
    p.max_items = 20;
    p.title = FieldChain::new(TITLE);
    p.url = FieldChain::new(URL);
    p.company = FieldChain::new(COMPANY);
    p.location = FieldChain::new(LOCATION);
    p.posted = FieldChain::new(POSTED);
    p
}
