// src/sources/stepstone.rs
//! StepStone. Card markup uses generated class names, so every field has a
//! long chain and the company has a content fallback.

use super::SiteProfile;
use crate::extract::{Fallback, FieldChain, Locator};
use crate::filter::SearchScope;

static TITLE: &[Locator] = &[
    Locator::Text("h2 a"),
    Locator::Text("[data-testid=\"job-title\"] a"),
    Locator::Text("[data-at=\"job-item-title\"]"),
    Locator::Text(".listing-title a"),
    Locator::Text("h3 a"),
];

static URL: &[Locator] = &[
    Locator::Attr("h2 a", "href"),
    Locator::Attr("[data-testid=\"job-title\"] a", "href"),
    Locator::Attr("a[data-at=\"job-item-title\"]", "href"),
    Locator::Attr(".listing-title a", "href"),
    Locator::Attr("h3 a", "href"),
];

static COMPANY: &[Locator] = &[
    Locator::Text("[data-at=\"job-item-company-name\"]"),
    Locator::Text("[data-testid=\"company-name\"]"),
    Locator::Attr("a[href*=\"/cmp/\"] img[alt]", "alt"),
    Locator::Text("a[href*=\"/cmp/\"]"),
    Locator::TextContaining("span", "GmbH"),
    Locator::TextContaining("span", "AG"),
    Locator::TextContaining("span", "Inc"),
    Locator::TextContaining("span", "Ltd"),
    Locator::TextContaining("span", "SE"),
];

static LOCATION: &[Locator] = &[
    Locator::Text("[data-at=\"job-item-location\"]"),
    Locator::Text("[data-testid=\"job-location\"]"),
    Locator::Text(".listing-location"),
    Locator::Text(".location"),
];

static POSTED: &[Locator] = &[
    Locator::Attr("time", "datetime"),
    Locator::Text("[data-at=\"job-item-timeago\"]"),
    Locator::Text("time"),
];

/// `computer science` in `München` → `/jobs/computer-science/in-münchen`.
fn slug(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub fn search_url(scope: &SearchScope) -> String {
    let place = match scope.location.to_lowercase().as_str() {
        "munich" => "münchen".to_string(),
        other => slug(other),
    };
    let raw = format!(
        "https://www.stepstone.de/jobs/{}/in-{}",
        slug(scope.primary_keyword()),
        place
    );
    url::Url::parse(&raw).map(String::from).unwrap_or(raw)
}

pub fn profile(scope: &SearchScope) -> SiteProfile {
    let mut p = SiteProfile::new("StepStone", search_url(scope), "https://www.stepstone.de");
    p.accept_language = Some("de-DE,de;q=0.9,en;q=0.8");
    p.consent = &[
        "#ccmgt_explicit_accept",
        "[data-testid=\"cookie-accept-all\"]",
        "button[id*=\"accept\"]",
    ];
    p.listing = &[
        "[data-testid=\"job-item\"]",
        "article[data-at=\"job-item\"]",
        ".listing-item",
        "[data-testid*=\"job\"]",
        ".job-element",
    ];
    p.max_items = 20;
    p.title = FieldChain::new(TITLE);
    p.url = FieldChain::new(URL);
    p.company = FieldChain::new(COMPANY).with_fallback(Fallback::TextLine {
        min_len: 3,
        max_len: 80,
    });
    p.location = FieldChain::new(LOCATION);
    p.posted = FieldChain::new(POSTED);
    p
}
