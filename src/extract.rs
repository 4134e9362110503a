// src/extract.rs
//! Ordered-fallback field extraction.
//!
//! A field is described by a [`FieldChain`]: structural [`Locator`]s tried in
//! order (first non-empty, validated value wins, no merging) and an optional
//! content-based [`Fallback`] that runs only once every locator has missed.
//! A failing or slow locator is the same as a miss.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::trace;

use crate::browser::{BrowserResult, ElementHandle};
use crate::normalize::{clean_text, first_line};

/// Upper bound for resolving one locator.
pub const LOCATOR_WAIT: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    Company,
    Location,
    Url,
    PostedDate,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Title => "title",
            FieldKind::Company => "company",
            FieldKind::Location => "location",
            FieldKind::Url => "url",
            FieldKind::PostedDate => "posted_date",
        }
    }

    /// Shape a raw value for this field.
    pub fn clean(&self, raw: &str) -> String {
        match self {
            FieldKind::Company => first_line(raw),
            FieldKind::Url => raw.trim().to_string(),
            _ => clean_text(raw),
        }
    }

    /// Length heuristics that reject obvious false positives.
    pub fn accepts(&self, value: &str) -> bool {
        let n = value.chars().count();
        match self {
            FieldKind::Title => (2..=200).contains(&n),
            FieldKind::Company => (2..100).contains(&n),
            FieldKind::Location => (1..=120).contains(&n),
            FieldKind::Url => n > 0 && value != "#",
            FieldKind::PostedDate => (1..=80).contains(&n),
        }
    }
}

/// One structural query relative to a card element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// Text of the first visible match.
    Text(&'static str),
    /// Attribute of the first visible match carrying it.
    Attr(&'static str, &'static str),
    /// Text of the first visible match whose text contains the needle.
    TextContaining(&'static str, &'static str),
    /// Attribute of the card element itself.
    OwnAttr(&'static str),
    /// Regex over an attribute; `{1}` in the template is replaced by the
    /// first capture group.
    Capture {
        css: &'static str,
        attr: &'static str,
        pattern: &'static str,
        template: &'static str,
    },
    /// [`Locator::Capture`] over an attribute of the card element itself.
    OwnCapture {
        attr: &'static str,
        pattern: &'static str,
        template: &'static str,
    },
}

impl Locator {
    async fn resolve(&self, el: &dyn ElementHandle) -> BrowserResult<Option<String>> {
        match *self {
            Locator::Text(css) => {
                for m in el.query_all(css).await? {
                    if m.is_visible().await? {
                        let t = m.text().await?;
                        if !t.trim().is_empty() {
                            return Ok(Some(t));
                        }
                    }
                }
                Ok(None)
            }
            Locator::Attr(css, attr) => {
                for m in el.query_all(css).await? {
                    if m.is_visible().await? {
                        if let Some(v) = m.attribute(attr).await? {
                            if !v.trim().is_empty() {
                                return Ok(Some(v));
                            }
                        }
                    }
                }
                Ok(None)
            }
            Locator::TextContaining(css, needle) => {
                for m in el.query_all(css).await? {
                    if m.is_visible().await? {
                        let t = m.text().await?;
                        if t.contains(needle) {
                            return Ok(Some(t));
                        }
                    }
                }
                Ok(None)
            }
            Locator::OwnAttr(attr) => Ok(el.attribute(attr).await?),
            Locator::Capture {
                css,
                attr,
                pattern,
                template,
            } => {
                let Some(re) = compile(pattern) else {
                    return Ok(None);
                };
                for m in el.query_all(css).await? {
                    if let Some(v) = m.attribute(attr).await? {
                        if let Some(hit) = capture(&re, &v, template) {
                            return Ok(Some(hit));
                        }
                    }
                }
                Ok(None)
            }
            Locator::OwnCapture {
                attr,
                pattern,
                template,
            } => {
                let Some(re) = compile(pattern) else {
                    return Ok(None);
                };
                Ok(el
                    .attribute(attr)
                    .await?
                    .and_then(|v| capture(&re, &v, template)))
            }
        }
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            trace!(target: "extract", pattern, error = %e, "bad capture pattern");
            None
        }
    }
}

fn capture(re: &Regex, value: &str, template: &str) -> Option<String> {
    let id = re.captures(value)?.get(1)?;
    Some(template.replace("{1}", id.as_str()))
}

/// Content-based last resort, run after every locator missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// First text line of the card that is not a date, salary or skill tag
    /// and whose length lies within the window.
    TextLine { min_len: usize, max_len: usize },
}

impl Fallback {
    async fn resolve(&self, el: &dyn ElementHandle, exclude: &[String]) -> BrowserResult<Option<String>> {
        match *self {
            Fallback::TextLine { min_len, max_len } => {
                let lines = el.text_lines().await?;
                Ok(lines.into_iter().map(|l| clean_text(&l)).find(|l| {
                    let n = l.chars().count();
                    n >= min_len
                        && n <= max_len
                        && !exclude.iter().any(|x| x.eq_ignore_ascii_case(l))
                        && !looks_like_noise(l)
                }))
            }
        }
    }
}

/// Dates, salaries, skill tags and employment-type chips.
pub fn looks_like_noise(line: &str) -> bool {
    static RE_DATE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)(\d{1,2}\.\d{1,2}\.\d{2,4}|\b\d{4}-\d{2}-\d{2}\b|\b(vor|ago|today|heute|gestern|yesterday)\b|\b\d+\s*(tag|tagen|day|days|woche|wochen|week|weeks|stunden|hours)\b)",
        )
        .expect("noise date regex")
    });
    static RE_SALARY: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)(€|\$|\beur\b|\bgehalt\b|\bsalary\b|\d+\s*k\b|\d{2,3}\.\d{3})")
            .expect("noise salary regex")
    });
    const SKILLS: &[&str] = &[
        "java", "python", "javascript", "typescript", "react", "angular", "vue", "sql", "aws",
        "azure", "docker", "kubernetes", "c++", "c#", ".net", "go", "rust", "kotlin", "scala",
        "node.js", "linux", "git",
    ];
    const CHIPS: &[&str] = &[
        "vollzeit", "teilzeit", "full-time", "part-time", "homeoffice", "home office",
        "homeoffice möglich", "teilweise home-office", "unbefristet", "feste anstellung",
        "festanstellung", "praktikum", "werkstudent", "remote", "hybrid",
    ];

    let lower = line.trim().to_lowercase();
    RE_DATE.is_match(&lower)
        || RE_SALARY.is_match(&lower)
        || SKILLS.contains(&lower.as_str())
        || CHIPS.contains(&lower.as_str())
}

/// Ordered candidate locators for one logical field.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldChain {
    pub locators: &'static [Locator],
    pub fallback: Option<Fallback>,
}

impl FieldChain {
    pub const fn new(locators: &'static [Locator]) -> Self {
        Self {
            locators,
            fallback: None,
        }
    }

    pub const fn with_fallback(self, fallback: Fallback) -> Self {
        Self {
            locators: self.locators,
            fallback: Some(fallback),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty() && self.fallback.is_none()
    }
}

/// First non-empty, validated match of `chain` on `el`.
pub async fn extract_field(el: &dyn ElementHandle, kind: FieldKind, chain: &FieldChain) -> Option<String> {
    extract_field_excluding(el, kind, chain, &[]).await
}

/// Like [`extract_field`]; the content fallback skips lines equal to `exclude`
/// (values already taken by other fields of the same card).
pub async fn extract_field_excluding(
    el: &dyn ElementHandle,
    kind: FieldKind,
    chain: &FieldChain,
    exclude: &[String],
) -> Option<String> {
    for (idx, locator) in chain.locators.iter().enumerate() {
        match tokio::time::timeout(LOCATOR_WAIT, locator.resolve(el)).await {
            Ok(Ok(Some(raw))) => {
                let value = kind.clean(&raw);
                if kind.accepts(&value) {
                    trace!(target: "extract", field = kind.as_str(), idx, "locator hit");
                    return Some(value);
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => trace!(target: "extract", field = kind.as_str(), idx, error = %e, "locator failed"),
            Err(_) => trace!(target: "extract", field = kind.as_str(), idx, "locator timed out"),
        }
    }

    let fallback = chain.fallback?;
    match tokio::time::timeout(LOCATOR_WAIT, fallback.resolve(el, exclude)).await {
        Ok(Ok(Some(raw))) => {
            let value = kind.clean(&raw);
            kind.accepts(&value).then_some(value)
        }
        _ => None,
    }
}
