use std::sync::Arc;

use futures::future::join_all;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval, Interval, MissedTickBehavior},
};

use crate::{
    classify::Classifier,
    config::PipelineConfig,
    domain::{ClassificationResult, PageMessage},
    web_content::ContentSource,
};

/// Snapshot emitted while a run is in progress and once when it ends.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Progress {
        batch: usize,
        total_batches: usize,
        results: Vec<ClassificationResult>,
    },
    Complete {
        results: Vec<ClassificationResult>,
    },
}

impl PipelineEvent {
    pub fn results(&self) -> &[ClassificationResult] {
        match self {
            PipelineEvent::Progress { results, .. } | PipelineEvent::Complete { results } => {
                results
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, PipelineEvent::Complete { .. })
    }

    pub fn into_message(self) -> PageMessage {
        match self {
            PipelineEvent::Progress { results, .. } | PipelineEvent::Complete { results } => {
                PageMessage::SemanticResults { results }
            }
        }
    }
}

/// Fetches and labels links in fixed-size batches.
///
/// Every fetch in a batch is awaited together; a batch starts only after the
/// previous one finished and a pacing token is available. Results keep the
/// input order.
pub struct ClassificationPipeline<S: ?Sized> {
    source: Arc<S>,
    classifier: Classifier,
    config: PipelineConfig,
}

impl<S> ClassificationPipeline<S>
where
    S: ContentSource + ?Sized + 'static,
{
    pub fn new(source: Arc<S>, classifier: Classifier, config: PipelineConfig) -> Self {
        Self {
            source,
            classifier,
            config,
        }
    }

    /// Consumes harvested URL lists one run at a time until the sender closes.
    pub fn spawn(
        self: Arc<Self>,
        mut jobs: mpsc::Receiver<Vec<String>>,
        events: mpsc::Sender<PipelineEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(urls) = jobs.recv().await {
                self.run(urls, &events).await;
            }
            tracing::debug!(target: "pipeline", "job channel closed; worker stopped");
        })
    }

    pub async fn run(
        &self,
        urls: Vec<String>,
        events: &mpsc::Sender<PipelineEvent>,
    ) -> Vec<ClassificationResult> {
        let batch_size = self.config.batch_size.max(1);
        let total_batches = urls.len().div_ceil(batch_size);
        let mut pacer = self.pacer();
        let mut results = Vec::with_capacity(urls.len());

        tracing::info!(target: "pipeline", urls = urls.len(), total_batches, "classification run started");

        for (index, batch) in urls.chunks(batch_size).enumerate() {
            if let Some(pacer) = pacer.as_mut() {
                pacer.tick().await;
            }
            tracing::debug!(
                target: "pipeline",
                batch = index + 1,
                total_batches,
                size = batch.len(),
                "processing batch"
            );

            let labelled = join_all(batch.iter().map(|url| self.classify_one(url))).await;
            results.extend(labelled);

            emit(
                events,
                PipelineEvent::Progress {
                    batch: index + 1,
                    total_batches,
                    results: results.clone(),
                },
            )
            .await;
        }

        emit(
            events,
            PipelineEvent::Complete {
                results: results.clone(),
            },
        )
        .await;
        tracing::info!(target: "pipeline", results = results.len(), "classification run finished");
        results
    }

    async fn classify_one(&self, url: &str) -> ClassificationResult {
        let verdict = match self.source.fetch_text(url).await {
            Ok(Some(text)) => self.classifier.classify_content(&text, url),
            Ok(None) => {
                tracing::debug!(target: "pipeline", url, "no readable text; using domain fallback");
                self.classifier.classify_domain(url)
            }
            Err(err) => {
                tracing::warn!(target: "pipeline", url, error = %err, "fetch failed; using domain fallback");
                self.classifier.classify_domain(url)
            }
        };
        ClassificationResult::from_verdict(url, verdict)
    }

    fn pacer(&self) -> Option<Interval> {
        if self.config.batch_interval.is_zero() {
            return None;
        }
        let mut pacer = interval(self.config.batch_interval);
        pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(pacer)
    }
}

async fn emit(events: &mpsc::Sender<PipelineEvent>, event: PipelineEvent) {
    if events.send(event).await.is_err() {
        tracing::debug!(target: "pipeline", "result listener is gone; event dropped");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use anyhow::{anyhow, Result};
    use futures::future::BoxFuture;

    use super::*;
    use crate::domain::Label;

    #[derive(Default)]
    struct StubSource {
        pages: HashMap<String, String>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn with_pages(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, text)| (url.to_string(), text.to_string()))
                    .collect(),
                ..Self::default()
            }
        }
    }

    impl ContentSource for StubSource {
        fn fetch_text<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                match self.pages.get(url) {
                    Some(text) if text.is_empty() => Ok(None),
                    Some(text) => Ok(Some(text.clone())),
                    None => Err(anyhow!("connection refused")),
                }
            })
        }
    }

    fn pipeline(source: StubSource) -> (Arc<StubSource>, ClassificationPipeline<StubSource>) {
        let source = Arc::new(source);
        let config = PipelineConfig {
            batch_size: 10,
            batch_interval: Duration::from_millis(1),
        };
        let pipeline = ClassificationPipeline::new(source.clone(), Classifier::default(), config);
        (source, pipeline)
    }

    async fn collect(mut rx: mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn twenty_five_urls_make_three_snapshots() {
        let urls: Vec<String> = (0..25)
            .map(|i| format!("https://site{i}.example-host.io/"))
            .collect();
        let (source, pipeline) = pipeline(StubSource::default());
        let (tx, rx) = mpsc::channel(8);

        let results = pipeline.run(urls.clone(), &tx).await;
        drop(tx);
        let events = collect(rx).await;

        let progress: Vec<usize> = events
            .iter()
            .filter(|e| !e.is_complete())
            .map(|e| e.results().len())
            .collect();
        assert_eq!(progress, vec![10, 20, 25]);
        assert!(events.last().unwrap().is_complete());
        assert_eq!(events.len(), 4);
        assert_eq!(events.last().unwrap().results().len(), 25);

        let order: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        let expected: Vec<&str> = urls.iter().map(String::as_str).collect();
        assert_eq!(order, expected);

        assert_eq!(source.calls.load(Ordering::SeqCst), 25);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn failed_fetch_uses_domain_fallback_only() {
        let (_, pipeline) = pipeline(StubSource::default());
        let (tx, _rx) = mpsc::channel(8);
        let urls = vec![
            "http://bit.ly/xyz".to_string(),
            "https://www.movierulz.vpn/film".to_string(),
            "https://unknown-host.io/".to_string(),
        ];

        let results = pipeline.run(urls.clone(), &tx).await;
        let classifier = Classifier::default();
        for (url, result) in urls.iter().zip(&results) {
            let expected = classifier.classify_domain(url);
            assert_eq!(result.label, expected.label, "{url}");
            assert_eq!(result.snippet, expected.snippet, "{url}");
        }
        assert_eq!(results[0].label, Label::Wrong);
    }

    #[tokio::test]
    async fn fetched_text_uses_content_heuristic() {
        let text = "Breaking news report: officials said the reporter was right.";
        let source = StubSource::with_pages(&[
            ("https://unknown-host.io/story", text),
            ("https://empty-host.io/", ""),
        ]);
        let (_, pipeline) = pipeline(source);
        let (tx, _rx) = mpsc::channel(8);

        let results = pipeline
            .run(
                vec![
                    "https://unknown-host.io/story".to_string(),
                    "https://empty-host.io/".to_string(),
                ],
                &tx,
            )
            .await;

        assert_eq!(results[0].label, Label::Correct);
        assert_eq!(results[0].snippet, text);
        assert_eq!(results[1].label, Label::Unknown);
        assert_eq!(results[1].snippet, "Content could not be fetched");
    }

    #[tokio::test]
    async fn empty_input_still_completes() {
        let (_, pipeline) = pipeline(StubSource::default());
        let (tx, rx) = mpsc::channel(2);
        assert!(pipeline.run(Vec::new(), &tx).await.is_empty());
        drop(tx);
        let events = collect(rx).await;
        assert_eq!(events, vec![PipelineEvent::Complete { results: vec![] }]);
    }

    #[tokio::test]
    async fn worker_processes_jobs_in_order() {
        let (_, pipeline) = pipeline(StubSource::default());
        let (job_tx, job_rx) = mpsc::channel(4);
        let (event_tx, event_rx) = mpsc::channel(16);
        let handle = Arc::new(pipeline).spawn(job_rx, event_tx);

        job_tx.send(vec!["https://a-host.io/".to_string()]).await.unwrap();
        job_tx.send(vec!["https://b-host.io/".to_string()]).await.unwrap();
        drop(job_tx);
        handle.await.unwrap();

        let finals: Vec<String> = collect(event_rx)
            .await
            .into_iter()
            .filter(PipelineEvent::is_complete)
            .map(|e| e.results()[0].url.clone())
            .collect();
        assert_eq!(finals, vec!["https://a-host.io/", "https://b-host.io/"]);
    }
}
