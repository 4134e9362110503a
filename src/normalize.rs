// src/normalize.rs
//! Text, URL and date normalization for scraped card fields.

use chrono::{NaiveDate, TimeDelta};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Relative ages beyond this are treated as unparseable.
const MAX_AGE_DAYS: i64 = 3_650;

/// Query parameters that vary between visits to the same posting.
const TRACKING_PARAMS: &[&str] = &["refid", "trackingid", "position", "pagenum", "trk", "from"];

/// Decode entities, collapse whitespace, trim.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

/// First non-empty line of a multi-line text, cleaned.
pub fn first_line(s: &str) -> String {
    s.lines()
        .map(clean_text)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
}

/// Resolve `href` against `base` and strip what does not identify the posting.
/// Returns `None` for empty, fragment-only and script hrefs.
pub fn canonical_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }

    let mut url = match Url::parse(href) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base).ok()?.join(href).ok()?,
        Err(_) => return None,
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            let k = k.to_ascii_lowercase();
            !TRACKING_PARAMS.contains(&k.as_str()) && !k.starts_with("utm_")
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept.iter());
    }

    Some(url.to_string())
}

/// Best-effort posting date from card text. `None` when nothing parses;
/// callers fall back to the scrape date.
pub fn parse_posted_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    static RE_DOTTED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").expect("dotted date regex"));
    static RE_ISO: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("iso date regex"));
    static RE_RELATIVE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(\d+)\+?\s*(minute|minuten|min|hour|hours|stunde|stunden|day|days|tag|tagen|tage|week|weeks|woche|wochen|month|months|monat|monaten)\b",
        )
        .expect("relative date regex")
    });
    static RE_MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{4})\b").expect("month-name regex")
    });

    if let Some(c) = RE_DOTTED.captures(&lower) {
        let (d, m, y) = (c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(y, m, d);
    }
    if let Some(c) = RE_ISO.captures(&lower) {
        let (y, m, d) = (c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(y, m, d);
    }
    if lower.contains("today") || lower.contains("heute") || lower.contains("just posted") {
        return Some(today);
    }
    if lower.contains("yesterday") || lower.contains("gestern") {
        return today.pred_opt();
    }
    if let Some(c) = RE_RELATIVE.captures(&lower) {
        let n: i64 = c[1].parse().ok()?;
        let unit = &c[2];
        let per_unit = if unit.starts_with("min") || unit.starts_with("hour") || unit.starts_with("stunde") {
            0
        } else if unit.starts_with("day") || unit.starts_with("tag") {
            1
        } else if unit.starts_with("week") || unit.starts_with("woche") {
            7
        } else {
            30
        };
        let days = n.checked_mul(per_unit).filter(|d| *d <= MAX_AGE_DAYS)?;
        return today.checked_sub_signed(TimeDelta::try_days(days)?);
    }
    if let Some(c) = RE_MONTH_NAME.captures(text) {
        let joined = format!("{} {} {}", &c[1], &c[2], &c[3]);
        for fmt in ["%b %d %Y", "%B %d %Y"] {
            if let Ok(d) = NaiveDate::parse_from_str(&joined, fmt) {
                return Some(d);
            }
        }
    }
    None
}
