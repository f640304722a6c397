//! Actor that owns the pipeline state and sequences the stages.
//!
//! Commands arrive on an mpsc channel; each stage runs in its own task and
//! reports back on an internal channel tagged with the generation it was
//! started for. Snapshots are published on a watch channel after every
//! state change.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::stages;
use super::state::{Applied, PipelineState, SentimentJob};
use super::Snapshot;
use crate::config::Config;
use crate::embeddings::{Embedder, EmbeddingProvider};
use crate::error::{AnalysisError, Result};
use crate::input::parse_rows;
use crate::lexicon::{LexiconRootExtractor, RootExtractor};
use crate::merge::MergeOutcome;
use crate::model::{Coords, Sentiment};
use crate::reduction::{PcaUmapReducer, ReductionParams, Reducer};
use crate::sample::SAMPLE_RESPONSES;
use crate::segment::{Segmenter, UnicodeSegmenter};
use crate::sentiment::{LexiconSentiment, SentimentClassifier};

const COMMAND_BUFFER: usize = 32;

/// External collaborators used by the pipeline.
#[derive(Clone)]
pub struct Services {
    pub segmenter: Arc<dyn Segmenter>,
    pub embedder: Arc<dyn Embedder>,
    pub reducer: Arc<dyn Reducer>,
    pub sentiment: Arc<dyn SentimentClassifier>,
    pub roots: Arc<dyn RootExtractor>,
}

impl Services {
    /// Default collaborators, embedding provider taken from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            segmenter: Arc::new(UnicodeSegmenter),
            embedder: Arc::new(EmbeddingProvider::from_config(&config.embedding)?),
            reducer: Arc::new(PcaUmapReducer),
            sentiment: Arc::new(LexiconSentiment::new()?),
            roots: Arc::new(LexiconRootExtractor::new()?),
        })
    }
}

enum Command {
    Submit {
        raw: String,
        reply: oneshot::Sender<u64>,
    },
    RequestSentiment {
        reply: oneshot::Sender<Result<u64>>,
    },
    Shutdown,
}

enum StageResult {
    Embedded(Result<MergeOutcome>),
    Reduced(Result<Vec<Coords>>),
    Rooted(Result<Vec<Vec<String>>>),
}

enum Completion {
    Stage {
        generation: u64,
        result: StageResult,
    },
    Sentiment {
        generation: u64,
        ticket: u64,
        result: Result<Vec<Sentiment>>,
    },
}

pub struct Orchestrator {
    services: Services,
    config: Config,
    state: PipelineState,
    snapshots: watch::Sender<Snapshot>,
    completions: mpsc::UnboundedSender<Completion>,
    stage_task: Option<JoinHandle<()>>,
    sentiment_task: Option<JoinHandle<()>>,
}

impl Orchestrator {
    /// Start the actor on the current tokio runtime.
    pub fn spawn(services: Services, config: Config) -> OrchestratorHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let actor = Orchestrator {
            services,
            config,
            state: PipelineState::new(),
            snapshots: snapshot_tx,
            completions: completion_tx,
            stage_task: None,
            sentiment_task: None,
        };
        tokio::spawn(actor.run(command_rx, completion_rx));

        OrchestratorHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        debug!(
            "Orchestrator started - embedder={}, reducer={}",
            self.services.embedder.name(),
            self.services.reducer.name()
        );

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Submit { raw, reply }) => {
                        let generation = self.submit(raw);
                        let _ = reply.send(generation);
                    }
                    Some(Command::RequestSentiment { reply }) => {
                        let _ = reply.send(self.request_sentiment());
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(done) = completions.recv() => self.on_completion(done),
            }
        }

        abort(&mut self.stage_task);
        abort(&mut self.sentiment_task);
        debug!("Orchestrator stopped");
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.snapshot().clone());
    }

    fn submit(&mut self, raw: String) -> u64 {
        abort(&mut self.stage_task);
        abort(&mut self.sentiment_task);

        let generation = self.state.begin_run();
        self.publish();

        let raw = if raw.trim().is_empty() {
            info!("Empty submission - analysing built-in sample");
            SAMPLE_RESPONSES.to_string()
        } else {
            raw
        };

        match parse_rows(&raw, self.services.segmenter.as_ref()) {
            Ok((rows, report)) => {
                info!(
                    "Parsing completed - rows={}, responses={}, skipped={}",
                    rows.len(),
                    report.accepted,
                    report.skipped.len()
                );
                self.state.apply_parsed(generation, rows, report);
                self.publish();
                self.start_embedding(generation);
            }
            Err(e) => self.fail(generation, "Parsing", e),
        }
        generation
    }

    fn request_sentiment(&mut self) -> Result<u64> {
        let job = self.state.begin_sentiment()?;
        abort(&mut self.sentiment_task);
        self.publish();

        let SentimentJob {
            generation,
            ticket,
            texts,
        } = job;
        let classifier = Arc::clone(&self.services.sentiment);
        let batch_size = self.config.sentiment.batch_size;
        let tx = self.completions.clone();
        self.sentiment_task = Some(tokio::spawn(async move {
            let result = stages::classify_texts(&texts, classifier.as_ref(), batch_size).await;
            let _ = tx.send(Completion::Sentiment {
                generation,
                ticket,
                result,
            });
        }));
        Ok(ticket)
    }

    fn start_embedding(&mut self, generation: u64) {
        let rows = self.state.rows().to_vec();
        let embedder = Arc::clone(&self.services.embedder);
        let batch_size = self.config.embedding.batch_size;
        let threshold = self.config.merge.threshold;
        let tx = self.completions.clone();

        self.stage_task = Some(tokio::spawn(async move {
            let result = stages::embed_and_merge(rows, embedder.as_ref(), batch_size, threshold).await;
            let _ = tx.send(Completion::Stage {
                generation,
                result: StageResult::Embedded(result),
            });
        }));
    }

    fn start_mapping(&mut self, generation: u64) {
        let rows = self.state.rows().to_vec();
        let reducer = Arc::clone(&self.services.reducer);
        let params = ReductionParams::from(&self.config.reduction);
        let tx = self.completions.clone();

        // Blocking work cannot be aborted; it reports on its own and a
        // superseded result is dropped by the generation guard.
        let worker = tokio::task::spawn_blocking(move || {
            let result = stages::reduce_rows(&rows, reducer.as_ref(), &params);
            let _ = tx.send(Completion::Stage {
                generation,
                result: StageResult::Reduced(result),
            });
        });
        let tx = self.completions.clone();
        self.stage_task = Some(tokio::spawn(async move {
            if let Err(e) = worker.await {
                let _ = tx.send(Completion::Stage {
                    generation,
                    result: StageResult::Reduced(Err(AnalysisError::Reduction(format!("worker stopped: {e}")))),
                });
            }
        }));
    }

    fn start_stemming(&mut self, generation: u64) {
        let rows = self.state.rows().to_vec();
        let extractor = Arc::clone(&self.services.roots);
        let tx = self.completions.clone();

        let worker = tokio::task::spawn_blocking(move || {
            let result = stages::stem_rows(&rows, extractor.as_ref());
            let _ = tx.send(Completion::Stage {
                generation,
                result: StageResult::Rooted(result),
            });
        });
        let tx = self.completions.clone();
        self.stage_task = Some(tokio::spawn(async move {
            if let Err(e) = worker.await {
                let _ = tx.send(Completion::Stage {
                    generation,
                    result: StageResult::Rooted(Err(AnalysisError::service("stemming", format!("worker stopped: {e}")))),
                });
            }
        }));
    }

    fn fail(&mut self, generation: u64, stage: &str, err: AnalysisError) {
        if self.state.fail(generation, stage, &err) == Applied::Applied {
            error!("{} failed - generation={}: {}", stage, generation, err);
        }
        self.publish();
    }

    fn on_completion(&mut self, done: Completion) {
        match done {
            Completion::Stage { generation, result } => match result {
                StageResult::Embedded(Ok(outcome)) => {
                    match self.state.apply_embedded(generation, outcome) {
                        Applied::Applied => {
                            self.publish();
                            self.start_mapping(generation);
                        }
                        Applied::Stale => self.publish(),
                    }
                }
                StageResult::Embedded(Err(e)) => self.fail(generation, "Embedding", e),
                StageResult::Reduced(Ok(coords)) => match self.state.apply_coords(generation, coords) {
                    Ok(Applied::Applied) => {
                        self.publish();
                        self.start_stemming(generation);
                    }
                    Ok(Applied::Stale) => self.publish(),
                    Err(e) => self.fail(generation, "Mapping", e),
                },
                StageResult::Reduced(Err(e)) => self.fail(generation, "Mapping", e),
                StageResult::Rooted(Ok(roots)) => match self.state.apply_roots(generation, roots) {
                    Ok(Applied::Applied) => {
                        self.stage_task = None;
                        let snap = self.state.snapshot();
                        info!(
                            "Pipeline completed - generation={}, rows={}, merges={}, distinct_roots={}",
                            generation,
                            snap.rows.len(),
                            snap.merges,
                            snap.frequency.len()
                        );
                        self.publish();
                    }
                    Ok(Applied::Stale) => self.publish(),
                    Err(e) => self.fail(generation, "Stemming", e),
                },
                StageResult::Rooted(Err(e)) => self.fail(generation, "Stemming", e),
            },
            Completion::Sentiment {
                generation,
                ticket,
                result,
            } => {
                let applied = match result {
                    Ok(results) => match self.state.apply_sentiment(generation, ticket, results) {
                        Ok(applied) => applied,
                        Err(e) => self.sentiment_failed(generation, ticket, e),
                    },
                    Err(e) => self.sentiment_failed(generation, ticket, e),
                };
                if applied == Applied::Applied {
                    self.sentiment_task = None;
                }
                self.publish();
            }
        }
    }

    fn sentiment_failed(&mut self, generation: u64, ticket: u64, err: AnalysisError) -> Applied {
        let applied = self.state.fail_sentiment(generation, ticket, &err);
        if applied == Applied::Applied {
            warn!("Sentiment failed - generation={}: {}", generation, err);
        }
        applied
    }
}

fn abort(task: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = task.take() {
        if !handle.is_finished() {
            debug!("Aborting superseded worker");
        }
        handle.abort();
    }
}

/// Cloneable client for a running [`Orchestrator`].
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Snapshot>,
}

impl OrchestratorHandle {
    /// Replace the current analysis with one of `raw`; returns the new generation.
    pub async fn submit(&self, raw: impl Into<String>) -> Result<u64> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Submit {
                raw: raw.into(),
                reply,
            })
            .await
            .map_err(|_| AnalysisError::ChannelClosed)?;
        rx.await.map_err(|_| AnalysisError::ChannelClosed)
    }

    /// Start a sentiment pass over the current rows; returns its ticket.
    pub async fn request_sentiment(&self) -> Result<u64> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::RequestSentiment { reply })
            .await
            .map_err(|_| AnalysisError::ChannelClosed)?;
        rx.await.map_err(|_| AnalysisError::ChannelClosed)?
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for(&self, predicate: impl Fn(&Snapshot) -> bool) -> Result<Snapshot> {
        let mut rx = self.snapshots.clone();
        rx.wait_for(|s| predicate(s))
            .await
            .map(|s| Snapshot::clone(&s))
            .map_err(|_| AnalysisError::ChannelClosed)
    }

    /// Wait until `generation` is complete or failed, with no sentiment pass running.
    pub async fn wait_until_settled(&self, generation: u64) -> Result<Snapshot> {
        self.wait_for(|s| {
            s.generation == generation && s.status.is_settled() && !s.sentiment_running
        })
        .await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| AnalysisError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineStatus;
    use crate::testing::{DiagonalReducer, StubEmbedder};

    fn services(embedder: StubEmbedder) -> Services {
        Services {
            segmenter: Arc::new(UnicodeSegmenter),
            embedder: Arc::new(embedder),
            reducer: Arc::new(DiagonalReducer),
            sentiment: Arc::new(LexiconSentiment::new().unwrap()),
            roots: Arc::new(LexiconRootExtractor::new().unwrap()),
        }
    }

    #[tokio::test]
    async fn test_runs_to_complete() {
        let handle = Orchestrator::spawn(services(StubEmbedder::by_length()), Config::default());
        let g = handle.submit("1\tGreat teachers.\tparents").await.unwrap();
        let snap = handle.wait_until_settled(g).await.unwrap();
        assert_eq!(snap.status, PipelineStatus::Complete);
        assert_eq!(snap.rows[0].coords, Some(Coords { x: 0.0, y: 0.0 }));
        assert_eq!(snap.frequency.count("teacher"), 1);
    }

    #[tokio::test]
    async fn test_blank_submission_uses_sample() {
        let handle = Orchestrator::spawn(services(StubEmbedder::by_length()), Config::default());
        let g = handle.submit("   ").await.unwrap();
        let snap = handle.wait_until_settled(g).await.unwrap();
        assert_eq!(snap.status, PipelineStatus::Complete);
        assert!(snap.parse_report.accepted > 10);
        assert_eq!(snap.stakeholders, vec!["parents", "staff", "students"]);
    }

    #[tokio::test]
    async fn test_unusable_input_is_error() {
        let handle = Orchestrator::spawn(services(StubEmbedder::by_length()), Config::default());
        let g = handle.submit("no tabs here").await.unwrap();
        let snap = handle.wait_until_settled(g).await.unwrap();
        assert_eq!(snap.status, PipelineStatus::Error);
        assert!(snap.error.unwrap().starts_with("Parsing failed"));
    }

    #[tokio::test]
    async fn test_sentiment_before_submit_is_not_ready() {
        let handle = Orchestrator::spawn(services(StubEmbedder::by_length()), Config::default());
        let err = handle.request_sentiment().await.unwrap_err();
        assert!(matches!(err, AnalysisError::NotReady(_)));
    }

    #[tokio::test]
    async fn test_shutdown_closes_handle() {
        let handle = Orchestrator::spawn(services(StubEmbedder::by_length()), Config::default());
        handle.shutdown().await.unwrap();
        let _ = handle.subscribe().changed().await;
        assert!(handle.submit("1\ta\tb").await.is_err());
    }
}
