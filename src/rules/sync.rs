use anyhow::{Context, Result};

use super::{
    compiler::compile_rules,
    store::{RuleStore, RuleUpdate},
};

/// Replaces every installed rule with the set compiled from `sites`.
///
/// Existing rules are removed in one update and the new set added in a
/// second one; nothing is diffed. A failure part-way leaves whatever the
/// store holds at that point.
pub async fn sync_rules<S>(store: &S, sites: &[String], redirect_url: &str) -> Result<usize>
where
    S: RuleStore + ?Sized,
{
    tracing::debug!(target: "rules", ?sites, "current blocked sites");

    let existing = store
        .dynamic_rules()
        .await
        .context("failed to read installed rules")?;
    let remove_rule_ids: Vec<u32> = existing.iter().map(|rule| rule.id).collect();

    if !remove_rule_ids.is_empty() {
        tracing::debug!(target: "rules", ids = ?remove_rule_ids, "removing existing rules");
        store
            .update_dynamic_rules(RuleUpdate {
                remove_rule_ids,
                add_rules: Vec::new(),
            })
            .await
            .context("failed to remove existing rules")?;
    }

    let add_rules = compile_rules(sites, redirect_url);
    if !add_rules.is_empty() {
        tracing::debug!(target: "rules", count = add_rules.len(), "adding rules");
        store
            .update_dynamic_rules(RuleUpdate {
                remove_rule_ids: Vec::new(),
                add_rules,
            })
            .await
            .context("failed to add compiled rules")?;
    }

    let installed = store
        .dynamic_rules()
        .await
        .context("failed to verify installed rules")?
        .len();
    tracing::info!(
        target: "rules",
        sites = sites.len(),
        total = installed,
        "blocking rules updated"
    );
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use futures::future::BoxFuture;
    use parking_lot::Mutex;

    use super::*;
    use crate::rules::{compiler::NetworkRule, JsonRuleStore};

    #[derive(Default)]
    struct RecordingStore {
        rules: Mutex<Vec<NetworkRule>>,
        updates: Mutex<Vec<(usize, usize)>>,
        fail_adds: AtomicBool,
    }

    impl RuleStore for RecordingStore {
        fn dynamic_rules(&self) -> BoxFuture<'_, Result<Vec<NetworkRule>>> {
            let rules = self.rules.lock().clone();
            Box::pin(async move { Ok(rules) })
        }

        fn update_dynamic_rules(&self, update: RuleUpdate) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move {
                self.updates
                    .lock()
                    .push((update.remove_rule_ids.len(), update.add_rules.len()));
                if !update.add_rules.is_empty() && self.fail_adds.load(Ordering::SeqCst) {
                    anyhow::bail!("quota exceeded");
                }
                let mut rules = self.rules.lock();
                rules.retain(|rule| !update.remove_rule_ids.contains(&rule.id));
                rules.extend(update.add_rules);
                Ok(())
            })
        }
    }

    fn sites(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn replaces_stale_rules() {
        let store = RecordingStore::default();
        sync_rules(&store, &sites(&["a.com", "b.com"]), "https://r/")
            .await
            .unwrap();
        let total = sync_rules(&store, &sites(&["c.com"]), "https://r/")
            .await
            .unwrap();

        assert_eq!(total, 3);
        assert_eq!(*store.updates.lock(), vec![(0, 6), (6, 0), (0, 3)]);
        let filters: Vec<String> = store
            .rules
            .lock()
            .iter()
            .map(|r| r.condition.url_filter.clone())
            .collect();
        assert_eq!(filters, vec!["*://c.com/*", "*://www.c.com/*", "*://c.com"]);
    }

    #[tokio::test]
    async fn empty_list_clears_everything() {
        let store = RecordingStore::default();
        sync_rules(&store, &sites(&["a.com"]), "https://r/").await.unwrap();
        assert_eq!(sync_rules(&store, &[], "https://r/").await.unwrap(), 0);
        assert!(store.rules.lock().is_empty());
    }

    #[tokio::test]
    async fn failed_add_is_reported_without_rollback() {
        let store = RecordingStore::default();
        sync_rules(&store, &sites(&["a.com"]), "https://r/").await.unwrap();
        store.fail_adds.store(true, Ordering::SeqCst);

        assert!(sync_rules(&store, &sites(&["b.com"]), "https://r/").await.is_err());
        assert!(store.rules.lock().is_empty());
    }

    #[tokio::test]
    async fn repeated_sync_is_identical_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let store = JsonRuleStore::new(&path);
        let list = sites(&["a.com", "www.b.org"]);

        sync_rules(&store, &list, "https://r/").await.unwrap();
        let first = std::fs::read(&path).unwrap();
        sync_rules(&store, &list, "https://r/").await.unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }
}
