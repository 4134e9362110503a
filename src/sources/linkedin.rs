// src/sources/linkedin.rs
//! LinkedIn guest job search (past week, entry level, on-site/hybrid).

use super::{encode, Pagination, SiteProfile};
use crate::extract::{FieldChain, Locator};
use crate::filter::SearchScope;

const GEO_ID_MUNICH: &str = "100477049";

static TITLE: &[Locator] = &[
    Locator::Text("h3.base-search-card__title"),
    Locator::Text(".base-search-card__title"),
    Locator::Text("h3"),
];

static URL: &[Locator] = &[
    Locator::Attr("a.base-card__full-link", "href"),
    Locator::Attr("a[href*=\"/jobs/view/\"]", "href"),
];

static COMPANY: &[Locator] = &[
    Locator::Text("h4.base-search-card__subtitle a.hidden-nested-link"),
    Locator::Text("h4.base-search-card__subtitle"),
    Locator::Attr("img.artdeco-entity-image", "alt"),
];

static LOCATION: &[Locator] = &[
    Locator::Text(".job-search-card__location"),
    Locator::Text(".base-search-card__metadata span"),
];

static POSTED: &[Locator] = &[
    Locator::Attr("time.job-search-card__listdate", "datetime"),
    Locator::Attr("time.job-search-card__listdate--new", "datetime"),
    Locator::Attr("time", "datetime"),
    Locator::Text("time"),
];

pub fn search_url(scope: &SearchScope) -> String {
    format!(
        "https://www.linkedin.com/jobs/search/?distance=25&f_E=2&f_TPR=r604800&f_WT=1%2C3&geoId={GEO_ID_MUNICH}&keywords={}&location={}",
        encode(scope.primary_keyword()),
        encode(&scope.location),
    )
}

pub fn profile(scope: &SearchScope) -> SiteProfile {
    let mut p = SiteProfile::new("LinkedIn", search_url(scope), "https://www.linkedin.com");
    p.consent = &[
        "button[action-type=\"ACCEPT\"]",
        "button[data-tracking-control-name*=\"accept\"]",
    ];
    p.listing = &[".job-search-card", ".base-search-card", "ul.jobs-search__results-list > li"];
    p.pagination = Pagination::LoadMore {
        button: "button.infinite-scroller__show-more-button",
    };
    p.extra_pages = 1;
    p.max_items = 50;
    p.title = FieldChain::new(TITLE);
    p.url = FieldChain::new(URL);
    p.company = FieldChain::new(COMPANY);
    p.location = FieldChain::new(LOCATION);
    p.posted = FieldChain::new(POSTED);
    p
}
