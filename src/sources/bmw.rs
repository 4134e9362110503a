// src/sources/bmw.rs

use super::{encode, SiteProfile};
use crate::browser::{GotoOptions, WaitUntil};
use crate::extract::{FieldChain, Locator};
use crate::filter::SearchScope;
use std::time::Duration;

static TITLE: &[Locator] = &[
    Locator::Text(".grp-jobfinder__cell-title"),
    Locator::Text("[class*=\"cell-title\"]"),
];

static URL: &[Locator] = &[
    Locator::Attr("a.grp-popup-link-js", "href"),
    Locator::Attr("a[href*=\"/jobfinder/job-description\"]", "href"),
    Locator::Attr("a", "href"),
];

static LOCATION: &[Locator] = &[
    Locator::Text(".grp-jobfinder-cell-location"),
    Locator::Text("[class*=\"cell-location\"]"),
];

// "Published: 12.03.2025"
static POSTED: &[Locator] = &[
    Locator::Text(".grp-jobfinder__cell-publication"),
    Locator::Text("[class*=\"cell-publication\"]"),
];

/// The job finder takes its text and location filters from the query, which
/// replaces typing into the search box.
pub fn search_url(scope: &SearchScope) -> String {
    let keyword = scope
        .primary_keyword()
        .split_whitespace()
        .next()
        .unwrap_or("software");
    format!(
        "https://www.bmwgroup.jobs/de/en/jobfinder.html?text={}&location=DE%2F{}",
        encode(keyword),
        encode(&scope.location),
    )
}

pub fn profile(scope: &SearchScope) -> SiteProfile {
    let mut p = SiteProfile::new("BMW Careers", search_url(scope), "https://www.bmwgroup.jobs");
    p.goto = GotoOptions {
        wait_until: WaitUntil::NetworkIdle,
        timeout: Duration::from_secs(20),
    };
    p.consent = &["button.accept-button", "button[data-testid=\"uc-accept-all-button\"]"];
    p.listing = &[".grp-jobfinder__wrapper", "[class*=\"jobfinder__wrapper\"]"];
    p.max_items = 30;
    p.title = FieldChain::new(TITLE);
    p.url = FieldChain::new(URL);
    p.fixed_company = Some("BMW Group");
    p.location = FieldChain::new(LOCATION);
    p.posted = FieldChain::new(POSTED);
    p
}
