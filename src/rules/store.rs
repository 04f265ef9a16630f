use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use futures::future::BoxFuture;

use super::compiler::NetworkRule;

/// Bulk edit applied to the installed rules: removals first, then additions.
#[derive(Debug, Clone, Default)]
pub struct RuleUpdate {
    pub remove_rule_ids: Vec<u32>,
    pub add_rules: Vec<NetworkRule>,
}

/// The network layer that enforces redirect rules.
pub trait RuleStore: Send + Sync {
    fn dynamic_rules(&self) -> BoxFuture<'_, Result<Vec<NetworkRule>>>;

    fn update_dynamic_rules(&self, update: RuleUpdate) -> BoxFuture<'_, Result<()>>;
}

/// Rules kept as a JSON array on disk, replaced atomically on every update.
pub struct JsonRuleStore {
    path: PathBuf,
}

impl JsonRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<NetworkRule>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("malformed rule file {}", self.path.display()))
    }

    async fn save(&self, rules: &[NetworkRule]) -> Result<()> {
        let body = serde_json::to_vec_pretty(rules)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    async fn apply(&self, update: RuleUpdate) -> Result<()> {
        let remove: HashSet<u32> = update.remove_rule_ids.into_iter().collect();
        let mut rules = self.load().await?;
        rules.retain(|rule| !remove.contains(&rule.id));

        let mut ids: HashSet<u32> = rules.iter().map(|rule| rule.id).collect();
        for rule in &update.add_rules {
            if !ids.insert(rule.id) {
                bail!("rule with id {} already exists", rule.id);
            }
        }

        rules.extend(update.add_rules);
        self.save(&rules).await
    }
}

impl RuleStore for JsonRuleStore {
    fn dynamic_rules(&self) -> BoxFuture<'_, Result<Vec<NetworkRule>>> {
        Box::pin(self.load())
    }

    fn update_dynamic_rules(&self, update: RuleUpdate) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.apply(update))
    }
}
