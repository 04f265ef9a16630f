use std::fmt;

use serde::{Deserialize, Serialize};

/// Trust classification assigned to a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Correct,
    Wrong,
    Unknown,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Correct => "Correct",
            Label::Wrong => "Wrong",
            Label::Unknown => "Unknown",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Label::Correct => "✅",
            Label::Wrong => "❌",
            Label::Unknown => "⚠️",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Label::Correct => "#388e3c",
            Label::Wrong => "#d32f2f",
            Label::Unknown => "#f57c00",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label plus the excerpt or note explaining it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub label: Label,
    pub snippet: String,
}

impl Verdict {
    pub fn new(label: Label, snippet: impl Into<String>) -> Self {
        Self {
            label,
            snippet: snippet.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub url: String,
    pub label: Label,
    pub snippet: String,
}

impl ClassificationResult {
    pub fn from_verdict(url: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            url: url.into(),
            label: verdict.label,
            snippet: verdict.snippet,
        }
    }
}
