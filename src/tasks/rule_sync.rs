use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{
    config::BlockingConfig,
    db::blocked_sites::BlockedSitesRepository,
    infrastructure::shutdown::ShutdownListener,
    rules::{sync_rules, RuleStore},
};

/// Keeps the installed rules in step with the blocked-site list.
///
/// Syncs once on start, again whenever the list read from storage differs
/// from the last one applied, and on every explicit request.
pub struct RuleSyncWorker<S: ?Sized> {
    repository: BlockedSitesRepository,
    store: Arc<S>,
    config: BlockingConfig,
    applied: Mutex<Option<Vec<String>>>,
}

impl<S> RuleSyncWorker<S>
where
    S: RuleStore + ?Sized + 'static,
{
    pub fn new(repository: BlockedSitesRepository, store: Arc<S>, config: BlockingConfig) -> Self {
        Self {
            repository,
            store,
            config,
            applied: Mutex::new(None),
        }
    }

    pub fn spawn(
        self: Arc<Self>,
        requests: mpsc::Receiver<()>,
        mut shutdown: ShutdownListener,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run_loop(requests, &mut shutdown).await;
            tracing::info!(target: "rules", "rule sync worker stopped");
        })
    }

    async fn run_loop(&self, mut requests: mpsc::Receiver<()>, shutdown: &mut ShutdownListener) {
        let mut ticker = interval(self.config.watch_interval.max(std::time::Duration::from_millis(10)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut requests_open = true;

        loop {
            if shutdown.is_triggered() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.sync_if_changed().await {
                        tracing::error!(target: "rules", error = %err, "error updating blocking rules");
                    }
                }
                request = requests.recv(), if requests_open => {
                    match request {
                        Some(()) => {
                            if let Err(err) = self.sync_now().await {
                                tracing::error!(target: "rules", error = %err, "error updating blocking rules");
                            }
                        }
                        None => requests_open = false,
                    }
                }
                _ = shutdown.notified() => break,
            }
        }
    }

    /// Recompiles from the current list regardless of what was applied before.
    pub async fn sync_now(&self) -> Result<usize> {
        let sites = self.repository.sites().await?;
        self.install(sites).await
    }

    async fn sync_if_changed(&self) -> Result<()> {
        let sites = self.repository.sites().await?;
        if self.applied.lock().as_ref() == Some(&sites) {
            return Ok(());
        }
        tracing::info!(target: "rules", sites = sites.len(), "blocked-site list changed");
        self.install(sites).await.map(|_| ())
    }

    /// A failed install is not retried until the list changes or a sync is requested.
    async fn install(&self, sites: Vec<String>) -> Result<usize> {
        let outcome = sync_rules(self.store.as_ref(), &sites, &self.config.redirect_url).await;
        *self.applied.lock() = Some(sites);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use anyhow::anyhow;
    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        db::init_memory_pool,
        infrastructure::shutdown::Shutdown,
        rules::{JsonRuleStore, NetworkRule, RuleUpdate},
    };

    #[derive(Default)]
    struct BrokenStore {
        attempts: AtomicUsize,
    }

    impl RuleStore for BrokenStore {
        fn dynamic_rules(&self) -> BoxFuture<'_, Result<Vec<NetworkRule>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn update_dynamic_rules(&self, _update: RuleUpdate) -> BoxFuture<'_, Result<()>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(anyhow!("rule quota exceeded")) })
        }
    }

    async fn wait_for_rules(store: &JsonRuleStore, expected: usize) -> bool {
        for _ in 0..200 {
            if store.dynamic_rules().await.unwrap().len() == expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn worker(
        repository: &BlockedSitesRepository,
        store: &Arc<JsonRuleStore>,
        watch_interval: Duration,
    ) -> Arc<RuleSyncWorker<JsonRuleStore>> {
        Arc::new(RuleSyncWorker::new(
            repository.clone(),
            store.clone(),
            BlockingConfig {
                redirect_url: "https://r.example/".to_string(),
                watch_interval,
            },
        ))
    }

    #[tokio::test]
    async fn follows_list_changes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonRuleStore::new(dir.path().join("rules.json")));
        let repository = BlockedSitesRepository::new(init_memory_pool().await.unwrap());
        repository.add("a.com").await.unwrap();

        let shutdown = Shutdown::new();
        let (_request_tx, request_rx) = mpsc::channel(1);
        let handle = worker(&repository, &store, Duration::from_millis(20))
            .spawn(request_rx, shutdown.subscribe());

        assert!(wait_for_rules(&store, 3).await);
        repository.add("b.com").await.unwrap();
        assert!(wait_for_rules(&store, 6).await);

        shutdown.trigger();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn explicit_request_resyncs() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonRuleStore::new(dir.path().join("rules.json")));
        let repository = BlockedSitesRepository::new(init_memory_pool().await.unwrap());
        repository.add("a.com").await.unwrap();
        repository.add("b.com").await.unwrap();

        let shutdown = Shutdown::new();
        let (request_tx, request_rx) = mpsc::channel(1);
        let handle = worker(&repository, &store, Duration::from_secs(3_600))
            .spawn(request_rx, shutdown.subscribe());
        assert!(wait_for_rules(&store, 6).await);

        repository.remove("a.com").await.unwrap();
        request_tx.send(()).await.unwrap();
        assert!(wait_for_rules(&store, 3).await);

        let filters: Vec<String> = store
            .dynamic_rules()
            .await
            .unwrap()
            .into_iter()
            .map(|rule| rule.condition.url_filter)
            .collect();
        assert_eq!(filters, vec!["*://b.com/*", "*://www.b.com/*", "*://b.com"]);

        shutdown.trigger();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn failed_install_waits_for_a_list_change() {
        let repository = BlockedSitesRepository::new(init_memory_pool().await.unwrap());
        repository.add("a.com").await.unwrap();
        let store = Arc::new(BrokenStore::default());
        let worker = Arc::new(RuleSyncWorker::new(
            repository.clone(),
            store.clone(),
            BlockingConfig {
                redirect_url: "https://r.example/".to_string(),
                watch_interval: Duration::from_millis(20),
            },
        ));

        let shutdown = Shutdown::new();
        let (request_tx, request_rx) = mpsc::channel(1);
        let handle = worker.spawn(request_rx, shutdown.subscribe());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.attempts.load(Ordering::SeqCst), 1);

        repository.add("b.com").await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);

        request_tx.send(()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.attempts.load(Ordering::SeqCst), 3);

        shutdown.trigger();
        handle.await.unwrap();
    }
}
