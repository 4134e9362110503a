// src/sources/apple.rs

use super::{encode, SiteProfile};
use crate::browser::{GotoOptions, WaitUntil};
use crate::extract::{FieldChain, Locator};
use crate::filter::SearchScope;
use std::time::Duration;

static TITLE: &[Locator] = &[Locator::Text("h3 a"), Locator::Text("h3")];

static URL: &[Locator] = &[
    Locator::Attr("h3 a", "href"),
    Locator::Attr("a[href*=\"/details/\"]", "href"),
];

static LOCATION: &[Locator] = &[
    Locator::Text(".table--advanced-search__location-sub"),
    Locator::Text("[id*=\"storeName\"]"),
];

static POSTED: &[Locator] = &[Locator::Text(".job-posted-date"), Locator::Text("[class*=\"posted\"]")];

pub fn search_url(scope: &SearchScope) -> String {
    let key = scope
        .primary_keyword()
        .split_whitespace()
        .next()
        .unwrap_or("software");
    format!(
        "https://jobs.apple.com/en-us/search?location={}-MUN&key={}",
        encode(&scope.location.to_lowercase()),
        encode(key),
    )
}

pub fn profile(scope: &SearchScope) -> SiteProfile {
    let mut p = SiteProfile::new("Apple Careers", search_url(scope), "https://jobs.apple.com");
    p.goto = GotoOptions {
        wait_until: WaitUntil::NetworkIdle,
        timeout: Duration::from_secs(30),
    };
    // Filter accordions share the class; only list items are jobs.
    p.listing = &[".rc-accordion-item[role=\"listitem\"]", "tbody[id^=\"accordion\"]"];
    p.max_items = 30;
    p.title = FieldChain::new(TITLE);
    p.url = FieldChain::new(URL);
    p.fixed_company = Some("Apple");
    p.location = FieldChain::new(LOCATION);
    p.posted = FieldChain::new(POSTED);
    p.url_pattern = Some(r"/details/\d+");
    p
}
