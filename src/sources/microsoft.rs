// src/sources/microsoft.rs
//! Microsoft Careers. Cards rarely carry a usable link, so the detail URL is
//! synthesized from whatever job id the card exposes.

use super::{encode, SiteProfile};
use crate::browser::{GotoOptions, WaitUntil};
use crate::extract::{FieldChain, Locator};
use crate::filter::SearchScope;
use std::time::Duration;

static TITLE: &[Locator] = &[Locator::Text("h2"), Locator::Text("[role=\"heading\"]")];

static URL: &[Locator] = &[
    Locator::Capture {
        css: "[aria-label*=\"Job item\"]",
        attr: "aria-label",
        pattern: r"Job item (\d+)",
        template: "https://jobs.careers.microsoft.com/global/en/job/{1}",
    },
    Locator::OwnCapture {
        attr: "aria-label",
        pattern: r"Job item (\d+)",
        template: "https://jobs.careers.microsoft.com/global/en/job/{1}",
    },
    Locator::Attr("a[href]", "href"),
    Locator::OwnCapture {
        attr: "data-automationid",
        pattern: r"^(?:ListCell)?(\d+)(?:ListCell)?$",
        template: "https://jobs.careers.microsoft.com/global/en/job/{1}",
    },
];

static LOCATION: &[Locator] = &[Locator::Text("i[data-icon-name=\"POI\"] + span")];

static POSTED: &[Locator] = &[Locator::Text("i[data-icon-name=\"Clock\"] + span")];

pub fn search_url(scope: &SearchScope) -> String {
    format!(
        "https://jobs.careers.microsoft.com/global/en/search?q={}&lc={}%2C%20Bavaria%2C%20Germany",
        encode(scope.primary_keyword()).replace('+', "%20"),
        encode(&scope.location).replace('+', "%20"),
    )
}

pub fn profile(scope: &SearchScope) -> SiteProfile {
    let mut p = SiteProfile::new(
        "Microsoft Careers",
        search_url(scope),
        "https://jobs.careers.microsoft.com",
    );
    p.goto = GotoOptions {
        wait_until: WaitUntil::NetworkIdle,
        timeout: Duration::from_secs(20),
    };
    p.listing = &["[role=\"listitem\"]", "[data-automationid$=\"ListCell\"]"];
    p.max_items = 30;
    p.title = FieldChain::new(TITLE);
    p.url = FieldChain::new(URL);
    p.fixed_company = Some("Microsoft");
    p.location = FieldChain::new(LOCATION);
    p.posted = FieldChain::new(POSTED);
    p
}
