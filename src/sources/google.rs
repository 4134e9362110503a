// src/sources/google.rs
//! Google Careers, early-career roles.

use super::{encode, SiteProfile};
use crate::browser::{GotoOptions, WaitUntil};
use crate::extract::{FieldChain, Locator};
use crate::filter::SearchScope;
use std::time::Duration;

static TITLE: &[Locator] = &[Locator::Text("h3.QJPWVe"), Locator::Text("h3")];

static URL: &[Locator] = &[
    Locator::Attr("a.WpHeLc", "href"),
    Locator::Attr("a[href*=\"jobs/results/\"]", "href"),
];

static LOCATION: &[Locator] = &[Locator::Text("span.r0wTof"), Locator::Text("[class*=\"location\"]")];

pub fn search_url(scope: &SearchScope) -> String {
    format!(
        "https://www.google.com/about/careers/applications/jobs/results?location={}%2C%20Germany&q=%22{}%22&target_level=EARLY",
        encode(&scope.location).replace('+', "%20"),
        encode(scope.primary_keyword()).replace('+', "%20"),
    )
}

pub fn profile(scope: &SearchScope) -> SiteProfile {
    // Relative links resolve against the applications root.
    let mut p = SiteProfile::new(
        "Google Careers",
        search_url(scope),
        "https://www.google.com/about/careers/applications/",
    );
    p.goto = GotoOptions {
        wait_until: WaitUntil::NetworkIdle,
        timeout: Duration::from_secs(20),
    };
    p.listing = &["li.lLd3Je", "ul.spHGqe > li"];
    p.max_items = 30;
    p.title = FieldChain::new(TITLE);
    p.url = FieldChain::new(URL);
    p.fixed_company = Some("Google");
    p.location = FieldChain::new(LOCATION);
    p
}
