// src/notify/digest.rs
//! Digest composition: one message listing every job to deliver.

use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

use crate::types::PersistedJob;

const HTML_DESCRIPTION_CHARS: usize = 200;
const TEXT_DESCRIPTION_CHARS: usize = 150;

#[derive(Debug, Clone)]
pub struct Digest {
    pub subject: String,
    pub text: String,
    pub html: String,
    pub count: usize,
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

impl Digest {
    pub fn build(jobs: &[PersistedJob], location: &str) -> Self {
        let n = jobs.len();
        let subject = format!("{n} New Job{} Found in {location}", plural(n));

        let mut text = format!(
            "NEW JOB OPPORTUNITIES IN {}\n\nFound {n} new job{} matching your criteria:\n\n",
            location.to_uppercase(),
            plural(n)
        );
        for job in jobs {
            let _ = writeln!(text, "{}", job.title);
            let _ = writeln!(text, "Company: {}", job.company);
            let _ = writeln!(text, "Location: {}", job.location);
            let _ = writeln!(text, "Source: {}", job.source);
            let _ = writeln!(text, "URL: {}", job.url);
            if !job.description.is_empty() {
                let _ = writeln!(text, "{}", truncate(&job.description, TEXT_DESCRIPTION_CHARS));
            }
            let _ = writeln!(text, "{}", "=".repeat(50));
        }
        text.push_str("\nThis email was sent by your automated job harvester.\n");

        let mut cards = String::new();
        for job in jobs {
            let href = encode_double_quoted_attribute(&job.url);
            let _ = write!(
                cards,
                r#"<div style="border:1px solid #ddd;border-radius:8px;padding:20px;margin:15px 0;background-color:#f9f9f9;">
<h3 style="margin:0 0 10px 0;"><a href="{href}" style="text-decoration:none;color:#3498db;">{title}</a></h3>
<p style="margin:5px 0;"><strong>Company:</strong> {company}</p>
<p style="margin:5px 0;"><strong>Location:</strong> {location}</p>
<p style="margin:5px 0;"><strong>Source:</strong> {source}</p>
"#,
                title = encode_text(&job.title),
                company = encode_text(&job.company),
                location = encode_text(&job.location),
                source = encode_text(&job.source),
            );
            if !job.description.is_empty() {
                let _ = writeln!(
                    cards,
                    r#"<p style="margin:10px 0 0 0;color:#7f8c8d;font-size:14px;">{}</p>"#,
                    encode_text(&truncate(&job.description, HTML_DESCRIPTION_CHARS))
                );
            }
            let _ = writeln!(
                cards,
                r#"<p style="margin:15px 0 0 0;"><a href="{href}">View Job</a></p>
</div>"#
            );
        }

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>New Job Opportunities</title></head>
<body style="font-family:Arial,sans-serif;line-height:1.6;color:#333;max-width:600px;margin:0 auto;padding:20px;">
<h1 style="text-align:center;border-bottom:3px solid #3498db;padding-bottom:10px;">New Job Opportunities</h1>
<p style="text-align:center;color:#7f8c8d;">Found {n} new job{s} matching your criteria in {loc}</p>
{cards}
</body>
</html>
"#,
            s = plural(n),
            loc = encode_text(location),
        );

        Self {
            subject,
            text,
            html,
            count: n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job(title: &str, description: &str) -> PersistedJob {
        PersistedJob {
            id: 1,
            title: title.into(),
            company: "ACME & Sons".into(),
            location: "Munich".into(),
            url: "https://x.test/jobs?id=1&ref=a".into(),
            description: description.into(),
            source: "LinkedIn".into(),
            posted_date: None,
            scraped_at: Utc::now(),
            notified: false,
        }
    }

    #[test]
    fn subject_pluralizes() {
        assert_eq!(Digest::build(&[job("A", "")], "Munich").subject, "1 New Job Found in Munich");
        assert_eq!(
            Digest::build(&[job("A", ""), job("B", "")], "Munich").subject,
            "2 New Jobs Found in Munich"
        );
    }

    #[test]
    fn html_is_escaped() {
        let d = Digest::build(&[job("<script>alert(1)</script> Engineer", "")], "Munich");
        assert!(!d.html.contains("<script>"));
        assert!(d.html.contains("&lt;script&gt;"));
        assert!(d.html.contains("ACME &amp; Sons"));
        assert!(d.html.contains("id=1&amp;ref=a"));
        assert!(d.text.contains("ACME & Sons"));
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let long = "x".repeat(500);
        let d = Digest::build(&[job("Rust Engineer", &long)], "Munich");
        assert!(d.text.contains(&format!("{}...", "x".repeat(150))));
        assert!(!d.text.contains(&"x".repeat(151)));
        assert!(d.html.contains(&format!("{}...", "x".repeat(200))));
    }
}
