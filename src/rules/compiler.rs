use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Rules derived from each blocked site.
pub const RULES_PER_SITE: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub kind: RuleActionType,
    pub redirect: Redirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleActionType {
    Redirect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: Vec<ResourceType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
}

/// Strips scheme, a leading `www.` and trailing slashes; `None` for blank input.
pub fn normalize_site(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let host = without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme)
        .trim_end_matches('/');

    if host.is_empty() || host.contains(char::is_whitespace) {
        None
    } else {
        Some(host.to_string())
    }
}

/// Three redirect rules per site, IDs `3i+1..=3i+3` for site index `i`.
pub fn compile_rules(sites: &[String], redirect_url: &str) -> Vec<NetworkRule> {
    sites
        .iter()
        .enumerate()
        .flat_map(|(index, raw)| {
            let site = normalize_site(raw).unwrap_or_else(|| raw.trim().to_string());
            let base = index as u32 * RULES_PER_SITE;
            [
                format!("*://{site}/*"),
                format!("*://www.{site}/*"),
                format!("*://{site}"),
            ]
            .into_iter()
            .zip(1..=RULES_PER_SITE)
            .map(move |(url_filter, offset)| redirect_rule(base + offset, url_filter, redirect_url))
        })
        .collect()
}

fn redirect_rule(id: u32, url_filter: String, redirect_url: &str) -> NetworkRule {
    NetworkRule {
        id,
        priority: 1,
        action: RuleAction {
            kind: RuleActionType::Redirect,
            redirect: Redirect {
                url: redirect_url.to_string(),
            },
        },
        condition: RuleCondition {
            url_filter,
            resource_types: vec![ResourceType::MainFrame],
        },
    }
}

/// Installed rules with their URL filters compiled for lookups.
pub struct CompiledRuleSet {
    entries: Vec<(Regex, NetworkRule)>,
}

impl CompiledRuleSet {
    pub fn new(rules: Vec<NetworkRule>) -> Result<Self> {
        let entries = rules
            .into_iter()
            .map(|rule| {
                let matcher = url_filter_regex(&rule.condition.url_filter).with_context(|| {
                    format!("rule {} has an unusable urlFilter", rule.id)
                })?;
                Ok((matcher, rule))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest-priority rule redirecting a navigation to `url`, lowest ID on ties.
    pub fn matching_rule(&self, url: &str, resource_type: ResourceType) -> Option<&NetworkRule> {
        self.entries
            .iter()
            .filter(|(matcher, rule)| {
                rule.condition.resource_types.contains(&resource_type) && matcher.is_match(url)
            })
            .map(|(_, rule)| rule)
            .min_by_key(|rule| (std::cmp::Reverse(rule.priority), rule.id))
    }
}

/// `*` matches any run of characters; the filter may match anywhere in the URL.
fn url_filter_regex(filter: &str) -> Result<Regex> {
    let body = filter
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Ok(Regex::new(&format!("(?i){body}"))?)
}
