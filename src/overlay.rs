use std::{collections::HashMap, fmt::Write as _};

use dom_query::Document;
use url::Url;

use crate::{
    domain::{ClassificationResult, Label},
    harvest::{find_anchors, is_trusted_link, Anchor, ANCHOR_SELECTOR},
};

const PENDING_ICON: &str = "⏳";
const PENDING_TITLE: &str = "Analyzing safety...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Verdict { label: Label, tooltip: String },
    Pending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayStats {
    pub labelled: usize,
    pub pending: usize,
}

/// A page plus at most one trust marker per anchor.
///
/// Markers are kept apart from the source and only spliced into the DOM by
/// `to_html`, so re-applying results replaces them instead of stacking new ones.
#[derive(Debug, Clone)]
pub struct AnnotatedPage {
    source: String,
    anchors: Vec<Anchor>,
    markers: Vec<Option<Marker>>,
}

impl AnnotatedPage {
    pub fn from_html(html: impl Into<String>, base: Option<&Url>) -> Self {
        let source = html.into();
        let anchors = find_anchors(&source, base);
        let markers = vec![None; anchors.len()];
        Self {
            source,
            anchors,
            markers,
        }
    }

    pub fn marker(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index).and_then(Option::as_ref)
    }

    /// Marks anchors covered by `results` and flags the rest as pending.
    pub fn apply(&mut self, results: &[ClassificationResult]) -> OverlayStats {
        for marker in self.markers.iter_mut() {
            if matches!(marker, Some(Marker::Pending)) {
                *marker = None;
            }
        }

        let by_url: HashMap<&str, &ClassificationResult> =
            results.iter().map(|result| (result.url.as_str(), result)).collect();

        for (anchor, marker) in self.anchors.iter().zip(self.markers.iter_mut()) {
            let Some(url) = anchor.url.as_deref() else {
                continue;
            };
            if let Some(result) = by_url.get(url) {
                *marker = Some(Marker::Verdict {
                    label: result.label,
                    tooltip: format!("Safety: {} - {}", result.label, result.snippet),
                });
            } else if marker.is_none() && url.starts_with("http") && !is_trusted_link(url) {
                *marker = Some(Marker::Pending);
            }
        }

        let stats = self.stats();
        tracing::debug!(
            target: "overlay",
            labelled = stats.labelled,
            pending = stats.pending,
            "overlay refreshed"
        );
        stats
    }

    pub fn stats(&self) -> OverlayStats {
        self.markers
            .iter()
            .fold(OverlayStats::default(), |mut stats, marker| {
                match marker {
                    Some(Marker::Verdict { .. }) => stats.labelled += 1,
                    Some(Marker::Pending) => stats.pending += 1,
                    None => {}
                }
                stats
            })
    }

    /// The page with a marker element after every marked anchor.
    pub fn to_html(&self) -> String {
        if self.markers.iter().all(Option::is_none) {
            return self.source.clone();
        }

        let document = Document::from(self.source.as_str());
        for (link, marker) in document.select(ANCHOR_SELECTOR).iter().zip(&self.markers) {
            if let Some(marker) = marker {
                link.after_html(marker_html(marker));
            }
        }
        let html = document.html().to_string();
        html
    }
}

fn marker_html(marker: &Marker) -> String {
    match marker {
        Marker::Verdict { label, tooltip } => format!(
            "<span class=\"safety-symbol\" style=\"margin-left:8px;font-size:18px;font-weight:bold;\
             display:inline-block;vertical-align:middle;cursor:help;color:{}\" title=\"{}\">{}</span>",
            label.color(),
            escape_html(tooltip),
            label.icon()
        ),
        Marker::Pending => format!(
            "<span class=\"safety-loading\" style=\"margin-left:8px;font-size:16px;color:#666\" \
             title=\"{PENDING_TITLE}\">{PENDING_ICON}</span>"
        ),
    }
}

/// Plain-text listing of results, one link per entry.
pub fn render_report(results: &[ClassificationResult]) -> String {
    if results.is_empty() {
        return "No results available yet.\n".to_string();
    }
    let mut out = String::new();
    for result in results {
        let _ = writeln!(out, "{} {}: {}", result.label.icon(), result.label, result.url);
        if !result.snippet.is_empty() {
            let _ = writeln!(out, "    {}", result.snippet);
        }
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
