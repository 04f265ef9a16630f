use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use tokio::{sync::mpsc, time::timeout};
use url::Url;

use crate::{
    bridge::BridgeSession,
    classify::Classifier,
    config::AppConfig,
    db::{self, blocked_sites::BlockedSitesRepository},
    domain::ClassificationResult,
    harvest::harvest_links,
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    overlay::{render_report, AnnotatedPage},
    pipeline::{ClassificationPipeline, PipelineEvent},
    rules::{sync_rules, CompiledRuleSet, JsonRuleStore, ResourceType, RuleStore},
    tasks::rule_sync::RuleSyncWorker,
    web_content::WebContentFetcher,
};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LinkGuardApp {
    paths: ResolvedPaths,
    config: Arc<AppConfig>,
    repository: BlockedSitesRepository,
    rule_store: Arc<JsonRuleStore>,
    fetcher: Arc<WebContentFetcher>,
    shutdown: Shutdown,
}

impl LinkGuardApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let pool = db::init_pool(&paths.db_path)
            .await
            .with_context(|| format!("failed to open {}", paths.db_path.display()))?;
        let repository = BlockedSitesRepository::new(pool);
        let rule_store = Arc::new(JsonRuleStore::new(paths.rules_path.clone()));
        let fetcher = Arc::new(WebContentFetcher::new(config.web.clone())?);

        Ok(Self {
            paths,
            config,
            repository,
            rule_store,
            fetcher,
            shutdown,
        })
    }

    fn pipeline(&self) -> ClassificationPipeline<WebContentFetcher> {
        ClassificationPipeline::new(
            self.fetcher.clone(),
            Classifier::new(self.config.web.snippet_length),
            self.config.pipeline.clone(),
        )
    }

    /// Native-messaging host loop; returns when the browser disconnects or on shutdown.
    pub async fn serve(self) -> Result<()> {
        tracing::info!(
            target: "app",
            data = %self.paths.data_dir.display(),
            rules = %self.rule_store.path().display(),
            "linkguard host starting"
        );

        let (rule_tx, rule_rx) = mpsc::channel(1);
        let worker = Arc::new(RuleSyncWorker::new(
            self.repository.clone(),
            self.rule_store.clone(),
            self.config.blocking.clone(),
        ));
        let mut worker_handle = worker.spawn(rule_rx, self.shutdown.subscribe());

        let session = BridgeSession::new(Arc::new(self.pipeline()), rule_tx);
        let outcome = session
            .run(
                tokio::io::stdin(),
                tokio::io::stdout(),
                self.shutdown.subscribe(),
            )
            .await;

        self.shutdown.trigger();

        tokio::select! {
            res = &mut worker_handle => {
                if let Err(err) = res {
                    if err.is_panic() {
                        tracing::error!(target: "app", "rule sync worker panicked");
                    }
                }
            }
            _ = tokio::time::sleep(SHUTDOWN_TIMEOUT) => {
                tracing::warn!(
                    target: "app",
                    "rule sync worker did not stop within {:?}; aborting it",
                    SHUTDOWN_TIMEOUT
                );
                worker_handle.abort();
            }
        }

        self.close().await;
        tracing::info!(target: "app", "linkguard host stopped");
        outcome
    }

    pub async fn add_site(&self, site: &str) -> Result<()> {
        if self.repository.add(site).await? {
            println!("Blocked {}", site.trim());
        } else {
            println!("{} is already blocked", site.trim());
        }
        self.resync_after_change().await;
        Ok(())
    }

    pub async fn remove_site(&self, site: &str) -> Result<()> {
        if self.repository.remove(site).await? {
            println!("Unblocked {}", site.trim());
        } else {
            println!("{} was not blocked", site.trim());
        }
        self.resync_after_change().await;
        Ok(())
    }

    pub async fn list_sites(&self) -> Result<()> {
        let sites = self.repository.list().await?;
        if sites.is_empty() {
            println!("No blocked sites.");
            return Ok(());
        }

        let tz: Tz = self.config.timezone.parse().unwrap_or(chrono_tz::UTC);
        for (index, entry) in sites.iter().enumerate() {
            let first_rule = index as u32 * crate::rules::RULES_PER_SITE + 1;
            println!(
                "{:>3}. {:<40} rules {}-{}  added {}",
                index + 1,
                entry.site,
                first_rule,
                first_rule + crate::rules::RULES_PER_SITE - 1,
                entry.added_at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S")
            );
        }
        Ok(())
    }

    pub async fn sync_rules(&self) -> Result<()> {
        let sites = self.repository.sites().await?;
        let installed =
            sync_rules(self.rule_store.as_ref(), &sites, &self.config.blocking.redirect_url)
                .await?;
        println!(
            "Installed {} rules for {} sites into {}",
            installed,
            sites.len(),
            self.rule_store.path().display()
        );
        Ok(())
    }

    pub async fn show_rules(&self) -> Result<()> {
        let rules = self.rule_store.dynamic_rules().await?;
        println!("{}", serde_json::to_string_pretty(&rules)?);
        Ok(())
    }

    pub async fn check_url(&self, url: &str) -> Result<()> {
        let rules = CompiledRuleSet::new(self.rule_store.dynamic_rules().await?)?;
        if rules.is_empty() {
            println!("No rules installed; run `linkguard rules sync` first.");
            return Ok(());
        }
        match rules.matching_rule(url, ResourceType::MainFrame) {
            Some(rule) => println!(
                "{} is redirected to {} by rule {} ({})",
                url, rule.action.redirect.url, rule.id, rule.condition.url_filter
            ),
            None => println!("{} is not blocked ({} rules installed)", url, rules.len()),
        }
        Ok(())
    }

    /// Harvests a page's links, classifies them and optionally writes the annotated page.
    pub async fn scan(
        &self,
        source: &str,
        base_url: Option<&str>,
        output: Option<PathBuf>,
    ) -> Result<()> {
        let (html, base) = self.load_page(source, base_url).await?;
        let links = harvest_links(&html, base.as_ref());
        let mut page = AnnotatedPage::from_html(html, base.as_ref());
        page.apply(&[]);

        let results = self
            .run_pipeline(links, |event| {
                page.apply(event.results());
            })
            .await;

        print!("{}", render_report(&results));
        if let Some(path) = output {
            tokio::fs::write(&path, page.to_html())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Annotated page written to {}", path.display());
        }
        Ok(())
    }

    pub async fn classify(&self, urls: Vec<String>) -> Result<()> {
        let results = self.run_pipeline(urls, |_| {}).await;
        print!("{}", render_report(&results));
        Ok(())
    }

    pub async fn close(&self) {
        if timeout(SHUTDOWN_TIMEOUT, self.repository.close()).await.is_err() {
            tracing::warn!(
                target: "db",
                "database pool did not close within {:?}",
                SHUTDOWN_TIMEOUT
            );
        }
    }

    async fn run_pipeline<F>(&self, urls: Vec<String>, mut on_event: F) -> Vec<ClassificationResult>
    where
        F: FnMut(&PipelineEvent),
    {
        let pipeline = self.pipeline();
        let (tx, mut rx) = mpsc::channel(16);

        let run = async move {
            let results = pipeline.run(urls, &tx).await;
            drop(tx);
            results
        };
        let listen = async {
            while let Some(event) = rx.recv().await {
                if let PipelineEvent::Progress {
                    batch,
                    total_batches,
                    results,
                } = &event
                {
                    tracing::info!(
                        target: "app",
                        batch,
                        total_batches,
                        done = results.len(),
                        "batch classified"
                    );
                } else if event.is_complete() {
                    tracing::info!(target: "app", results = event.results().len(), "classification complete");
                }
                on_event(&event);
            }
        };

        let (results, ()) = tokio::join!(run, listen);
        results
    }

    async fn load_page(&self, source: &str, base_url: Option<&str>) -> Result<(String, Option<Url>)> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let base = Url::parse(source).with_context(|| format!("invalid URL {}", source))?;
            let html = self.fetcher.fetch_html(source).await?;
            return Ok((html, Some(base)));
        }

        let html = tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("failed to read {}", source))?;
        let base = match base_url {
            Some(raw) => Some(Url::parse(raw).with_context(|| format!("invalid base URL {}", raw))?),
            None => None,
        };
        if html.trim().is_empty() {
            bail!("{} is empty", source);
        }
        Ok((html, base))
    }

    async fn resync_after_change(&self) {
        let sites = match self.repository.sites().await {
            Ok(sites) => sites,
            Err(err) => {
                tracing::error!(target: "rules", error = %err, "failed to read blocked sites");
                return;
            }
        };
        if let Err(err) =
            sync_rules(self.rule_store.as_ref(), &sites, &self.config.blocking.redirect_url).await
        {
            tracing::error!(target: "rules", error = %err, "error updating blocking rules");
        }
    }
}
