use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};

use crate::{
    domain::{
        ClassificationResult, ControlMessage, IncomingMessage, OutgoingMessage, PageMessage,
    },
    infrastructure::shutdown::ShutdownListener,
    pipeline::{ClassificationPipeline, PipelineEvent},
    web_content::ContentSource,
};

use super::codec::{read_frame, write_message, FrameError};

const CHANNEL_CAPACITY: usize = 64;

/// One native-messaging conversation with the browser.
///
/// Captured URL lists go to the pipeline worker, every pipeline event is
/// written back as a `semanticResults` frame, and rule updates are handed
/// to the rule sync worker without waiting for them.
pub struct BridgeSession<S: ?Sized> {
    pipeline: Arc<ClassificationPipeline<S>>,
    rule_requests: mpsc::Sender<()>,
    latest: Arc<Mutex<Vec<ClassificationResult>>>,
}

impl<S> BridgeSession<S>
where
    S: ContentSource + ?Sized + 'static,
{
    pub fn new(pipeline: Arc<ClassificationPipeline<S>>, rule_requests: mpsc::Sender<()>) -> Self {
        Self {
            pipeline,
            rule_requests,
            latest: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn run<R, W>(
        self,
        mut reader: R,
        writer: W,
        mut shutdown: ShutdownListener,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::channel::<OutgoingMessage>(CHANNEL_CAPACITY);
        let (job_tx, job_rx) = mpsc::channel::<Vec<String>>(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<PipelineEvent>(CHANNEL_CAPACITY);

        let writer_handle = tokio::spawn(write_loop(writer, out_rx));
        let worker_handle = self.pipeline.clone().spawn(job_rx, event_tx);
        let forward_handle = tokio::spawn(forward_events(
            event_rx,
            out_tx.clone(),
            self.latest.clone(),
        ));

        tracing::info!(target: "bridge", "native messaging session started");

        loop {
            let frame = tokio::select! {
                frame = read_frame(&mut reader) => frame,
                _ = shutdown.notified() => {
                    tracing::info!(target: "bridge", "shutdown requested; closing session");
                    break;
                }
            };

            let payload = match frame {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    tracing::info!(target: "bridge", "browser closed the connection");
                    break;
                }
                Err(err) => {
                    tracing::error!(target: "bridge", error = %err, "unreadable frame; ending session");
                    break;
                }
            };

            let message = match serde_json::from_slice::<IncomingMessage>(&payload) {
                Ok(message) => message,
                Err(err) => {
                    tracing::warn!(target: "bridge", error = %err, "ignoring malformed message");
                    continue;
                }
            };

            self.dispatch(message, &job_tx, &out_tx).await;
        }

        drop(job_tx);
        drop(out_tx);

        if shutdown.is_triggered() {
            worker_handle.abort();
        } else if let Err(err) = worker_handle.await {
            if err.is_panic() {
                tracing::error!(target: "bridge", "pipeline worker panicked");
            }
        }
        let _ = forward_handle.await;
        let _ = writer_handle.await;

        tracing::info!(target: "bridge", "native messaging session finished");
        Ok(())
    }

    async fn dispatch(
        &self,
        message: IncomingMessage,
        jobs: &mpsc::Sender<Vec<String>>,
        out: &mpsc::Sender<OutgoingMessage>,
    ) {
        match message {
            IncomingMessage::Page(PageMessage::UrlsCaptured { urls }) => {
                tracing::info!(target: "bridge", count = urls.len(), "URLs received");
                if jobs.send(urls).await.is_err() {
                    tracing::error!(target: "bridge", "pipeline worker is gone; URLs dropped");
                }
            }
            IncomingMessage::Page(PageMessage::GetLatestResults) => {
                let results = self.latest.lock().clone();
                send_or_log(out, OutgoingMessage::LatestResults { results }).await;
            }
            IncomingMessage::Page(PageMessage::SemanticResults { .. }) => {
                tracing::debug!(target: "bridge", "ignoring results sent by the browser");
            }
            IncomingMessage::Control(ControlMessage::UpdateRules) => {
                if self.rule_requests.try_send(()).is_err() {
                    tracing::debug!(target: "bridge", "rule sync already pending");
                }
                send_or_log(out, OutgoingMessage::Ack { success: true }).await;
            }
        }
    }
}

async fn forward_events(
    mut events: mpsc::Receiver<PipelineEvent>,
    out: mpsc::Sender<OutgoingMessage>,
    latest: Arc<Mutex<Vec<ClassificationResult>>>,
) {
    while let Some(event) = events.recv().await {
        *latest.lock() = event.results().to_vec();
        send_or_log(&out, OutgoingMessage::Page(event.into_message())).await;
    }
}

async fn write_loop<W>(mut writer: W, mut outgoing: mpsc::Receiver<OutgoingMessage>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outgoing.recv().await {
        match write_message(&mut writer, &message).await {
            Ok(()) => {}
            Err(FrameError::Io(err)) => {
                tracing::error!(target: "bridge", error = %err, "browser pipe closed; dropping output");
                break;
            }
            Err(err) => {
                tracing::warn!(target: "bridge", error = %err, "message not sent");
            }
        }
    }
}

async fn send_or_log(out: &mpsc::Sender<OutgoingMessage>, message: OutgoingMessage) {
    if out.send(message).await.is_err() {
        tracing::warn!(target: "bridge", "writer is gone; message dropped");
    }
}
