//! Keyword and domain heuristics that label a link as Correct, Wrong or Unknown.
//!
//! `classify_content` runs when page text was retrieved; `classify_domain`
//! is the fallback when it was not. Both evaluate their checks in a fixed
//! order and stop at the first one that fires.

pub mod patterns;

use url::Url;

use crate::domain::{Label, Verdict};

use patterns::{
    keyword_hits, ADULT_DOMAIN_SET, ADULT_KEYWORDS, BLOCKED_PIRACY_DOMAIN_SET,
    LEGITIMATE_KEYWORDS, LINK_SHORTENERS, NEWS_DOMAIN_SET, NEWS_KEYWORDS, PIRACY_DOMAIN_SET,
    PIRACY_KEYWORDS, PIRACY_NEWS_KEYWORDS, STANDARD_DOMAIN_SET, SUSPICIOUS_DOMAIN_SET,
    SUSPICIOUS_KEYWORDS, WELL_KNOWN_DOMAIN_SET,
};

pub const INVALID_URL_NOTE: &str = "Invalid URL format";

#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    snippet_length: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Classifier {
    pub fn new(snippet_length: usize) -> Self {
        Self { snippet_length }
    }

    /// Labels a link from its fetched page text and its domain.
    pub fn classify_content(&self, text: &str, url: &str) -> Verdict {
        let Some(domain) = extract_domain(url) else {
            return Verdict::new(Label::Wrong, INVALID_URL_NOTE);
        };
        let content = text.to_lowercase();
        let snippet: String = text.chars().take(self.snippet_length).collect();

        let label = if is_news(&content, &domain) {
            Label::Correct
        } else if is_blocked_piracy_domain(&domain) {
            Label::Wrong
        } else if is_adult(&content, &domain) {
            Label::Wrong
        } else if is_piracy(&content, &domain) {
            Label::Wrong
        } else if is_well_known_domain(&domain) {
            Label::Correct
        } else if is_legitimate(&content) {
            Label::Correct
        } else if is_suspicious(&content) {
            // legitimacy was already ruled out by the previous branch
            Label::Wrong
        } else if url.contains("http://") || is_link_shortener(&domain) {
            Label::Wrong
        } else {
            Label::Unknown
        };

        Verdict::new(label, snippet)
    }

    /// Labels a link from its domain alone, for pages that could not be fetched.
    pub fn classify_domain(&self, url: &str) -> Verdict {
        let Some(domain) = extract_domain(url) else {
            return Verdict::new(Label::Wrong, INVALID_URL_NOTE);
        };

        if is_blocked_piracy_domain(&domain) {
            Verdict::new(Label::Wrong, "Known piracy site (content blocked)")
        } else if is_news("", &domain) {
            Verdict::new(Label::Correct, "News site (content blocked)")
        } else if is_adult("", &domain) {
            Verdict::new(Label::Wrong, "Adult content site (content blocked)")
        } else if is_well_known_domain(&domain) {
            Verdict::new(Label::Correct, "Well-known site (content blocked)")
        } else if is_link_shortener(&domain) {
            Verdict::new(Label::Wrong, "Link shortener (content blocked)")
        } else {
            Verdict::new(Label::Unknown, "Content could not be fetched")
        }
    }
}

/// Lowercased host of an absolute URL, or `None` when there is none.
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(host.to_lowercase())
}

fn is_news(content: &str, domain: &str) -> bool {
    NEWS_DOMAIN_SET.is_match(domain) || keyword_hits(content, NEWS_KEYWORDS) >= 3
}

fn is_blocked_piracy_domain(domain: &str) -> bool {
    BLOCKED_PIRACY_DOMAIN_SET.is_match(domain)
}

fn is_adult(content: &str, domain: &str) -> bool {
    ADULT_DOMAIN_SET.is_match(domain) || keyword_hits(content, ADULT_KEYWORDS) >= 1
}

fn is_piracy(content: &str, domain: &str) -> bool {
    let signal =
        PIRACY_DOMAIN_SET.is_match(domain) || keyword_hits(content, PIRACY_KEYWORDS) >= 2;
    let reporting = keyword_hits(content, PIRACY_NEWS_KEYWORDS) > 0;
    signal && !reporting
}

fn is_well_known_domain(domain: &str) -> bool {
    if WELL_KNOWN_DOMAIN_SET.is_match(domain) {
        return true;
    }
    STANDARD_DOMAIN_SET.is_match(domain) && !SUSPICIOUS_DOMAIN_SET.is_match(domain)
}

fn is_legitimate(content: &str) -> bool {
    keyword_hits(content, LEGITIMATE_KEYWORDS) >= 2
}

fn is_suspicious(content: &str) -> bool {
    keyword_hits(content, SUSPICIOUS_KEYWORDS) >= 2
}

fn is_link_shortener(domain: &str) -> bool {
    LINK_SHORTENERS.iter().any(|shortener| {
        domain == *shortener
            || domain
                .strip_suffix(shortener)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}
