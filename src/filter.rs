// src/filter.rs
//! Relevance and geo acceptance tests for scraped cards. Pure, no I/O.

/// Terms that make a title relevant regardless of configured keywords.
pub const GENERIC_TERMS: &[&str] = &["developer", "engineer", "software"];

/// Case-insensitive containment of any keyword or any generic term.
pub fn is_relevant<S: AsRef<str>>(title: &str, keywords: &[S]) -> bool {
    let t = title.to_lowercase();
    keywords
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .any(|k| t.contains(&k))
        || GENERIC_TERMS.iter().any(|g| t.contains(g))
}

/// Case-insensitive containment of any allow token. An empty location is
/// accepted: the search query was already geo-scoped.
pub fn is_in_geo_scope<S: AsRef<str>>(location: &str, allow_tokens: &[S]) -> bool {
    let loc = location.trim().to_lowercase();
    if loc.is_empty() {
        return true;
    }
    allow_tokens
        .iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .any(|t| loc.contains(&t))
}

/// Keyword and geo settings shared by every adapter of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchScope {
    pub keywords: Vec<String>,
    pub location: String,
    pub geo_tokens: Vec<String>,
}

impl SearchScope {
    pub fn accepts_title(&self, title: &str) -> bool {
        is_relevant(title, &self.keywords)
    }

    pub fn accepts_location(&self, location: &str) -> bool {
        is_in_geo_scope(location, &self.geo_tokens)
    }

    /// First keyword, used to build search URLs.
    pub fn primary_keyword(&self) -> &str {
        self.keywords
            .first()
            .map(String::as_str)
            .unwrap_or("software engineer")
    }
}

impl Default for SearchScope {
    fn default() -> Self {
        Self {
            keywords: vec!["software engineer".to_string()],
            location: "Munich".to_string(),
            geo_tokens: ["munich", "münchen", "bavaria", "bayern", "garching", "hybrid", "remote"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_terms_extend_keywords() {
        assert!(is_relevant("Senior Backend Engineer", &["java"]));
        assert!(is_relevant("Java Architect", &["java"]));
        assert!(!is_relevant("Sales Manager", &["java"]));
    }

    #[test]
    fn relevance_is_case_insensitive() {
        assert!(is_relevant("SOFTWARE ARCHITECT", &[] as &[&str]));
        assert!(is_relevant("Rust Entwickler", &["RUST"]));
    }

    #[test]
    fn blank_keywords_do_not_match_everything() {
        assert!(!is_relevant("Accountant", &["", "  "]));
    }

    #[test]
    fn empty_location_is_never_rejected() {
        assert!(is_in_geo_scope("", &["munich"]));
        assert!(is_in_geo_scope("   ", &["munich"]));
    }

    #[test]
    fn geo_tokens_match_case_insensitively() {
        let tokens = ["munich", "münchen", "remote"];
        assert!(is_in_geo_scope("München, Bayern", &tokens));
        assert!(is_in_geo_scope("Germany (Remote)", &tokens));
        assert!(!is_in_geo_scope("Berlin", &tokens));
    }

    #[test]
    fn scope_defaults_cover_munich_area() {
        let s = SearchScope::default();
        assert!(s.accepts_location("Garching bei München"));
        assert_eq!(s.primary_keyword(), "software engineer");
    }
}
