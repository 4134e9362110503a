// src/sources/glassdoor.rs

use super::SiteProfile;
use crate::extract::{FieldChain, Locator};
use crate::filter::SearchScope;
use tracing::warn;

static TITLE: &[Locator] = &[
    Locator::Text("a[class*=\"JobCard_jobTitle\"]"),
    Locator::Text("a[data-test=\"job-title\"]"),
    Locator::Text("a.jobLink"),
];

static URL: &[Locator] = &[
    Locator::Attr("a[class*=\"JobCard_jobTitle\"]", "href"),
    Locator::Attr("a[data-test=\"job-title\"]", "href"),
    Locator::Attr("a.jobLink", "href"),
];

static COMPANY: &[Locator] = &[
    Locator::Text("span[class*=\"EmployerProfile_compactEmployerName\"]"),
    Locator::Text("[class*=\"EmployerProfile_employerName\"]"),
    Locator::Text("[data-test=\"employer-short-name\"]"),
];

static LOCATION: &[Locator] = &[
    Locator::Text("div[class*=\"JobCard_location\"]"),
    Locator::Text("[data-test=\"emp-location\"]"),
];

static POSTED: &[Locator] = &[
    Locator::Text("div[class*=\"JobCard_listingAge\"]"),
    Locator::Text("[data-test=\"job-age\"]"),
];

const CITY_SLUG: &str = "munich";
const CITY_ID: &str = "IC4990924";

/// Glassdoor encodes the city as an opaque id and only Munich is mapped; the
/// keyword goes into the path slug together with its character span.
pub fn search_url(scope: &SearchScope) -> String {
    let loc = scope.location.to_lowercase();
    if !["munich", "münchen", "muenchen"].iter().any(|m| loc.contains(m)) {
        warn!(target: "scrape", location = %scope.location, "glassdoor only searches Munich");
    }

    let keyword = slug(scope.primary_keyword());
    let start = CITY_SLUG.len() + 1;
    let end = start + keyword.chars().count();
    format!(
        "https://www.glassdoor.de/Job/{CITY_SLUG}-{keyword}-jobs-SRCH_IL.0,{}_{CITY_ID}_KO{start},{end}.htm?includeNoSalaryJobs=true",
        CITY_SLUG.len()
    )
}

fn slug(keyword: &str) -> String {
    let words: Vec<String> = keyword
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        "software-engineer".to_string()
    } else {
        words.join("-")
    }
}

pub fn profile(scope: &SearchScope) -> SiteProfile {
    let mut p = SiteProfile::new("Glassdoor", search_url(scope), "https://www.glassdoor.de");
    p.consent = &["#onetrust-accept-btn-handler"];
    p.listing = &[
        "li[class*=\"JobsList_jobListItem\"]",
        "li[data-test=\"jobListing\"]",
        "li.react-job-listing",
    ];
    p.max_items = 15;
    p.title = FieldChain::new(TITLE);
    p.url = FieldChain::new(URL);
    p.company = FieldChain::new(COMPANY);
    p.location = FieldChain::new(LOCATION);
    p.posted = FieldChain::new(POSTED);
    p
}
