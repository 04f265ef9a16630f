use std::collections::HashSet;

use dom_query::Document;
use url::Url;

/// Anchors that can carry a link; script and style bodies never match.
pub const ANCHOR_SELECTOR: &str = "a[href]";

/// Search-engine infrastructure and sites treated as safe without a check.
pub const TRUSTED_LINK_MARKERS: &[&str] = &[
    "google.com",
    "googleusercontent.com",
    "gstatic.com",
    "googleapis.com",
    "google.co.in",
    "google.co.uk",
    "google.ca",
    "google.com.au",
    "google.de",
    "google.fr",
    "youtube.com",
    "wikipedia.org",
    "mcafee",
];

/// One `<a href>` element of a page, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub url: Option<String>,
}

pub fn is_trusted_link(url: &str) -> bool {
    TRUSTED_LINK_MARKERS.iter().any(|marker| url.contains(marker))
}

/// Every anchor in `html`, with its href resolved against `base`.
pub fn find_anchors(html: &str, base: Option<&Url>) -> Vec<Anchor> {
    let document = Document::from(html);
    let anchors = document
        .select(ANCHOR_SELECTOR)
        .iter()
        .map(|link| Anchor {
            url: link
                .attr("href")
                .and_then(|href| resolve(href.trim(), base)),
        })
        .collect();
    anchors
}

/// External links worth classifying, in page order, without duplicates.
pub fn harvest_links(html: &str, base: Option<&Url>) -> Vec<String> {
    let mut seen = HashSet::new();
    let links: Vec<String> = find_anchors(html, base)
        .into_iter()
        .filter_map(|anchor| anchor.url)
        .filter(|url| url.starts_with("http") && !is_trusted_link(url))
        .filter(|url| seen.insert(url.clone()))
        .collect();
    tracing::info!(target: "harvest", count = links.len(), "found filtered links");
    links
}

fn resolve(href: &str, base: Option<&Url>) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    let url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    Some(url.to_string())
}
