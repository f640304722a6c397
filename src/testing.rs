//! Deterministic collaborators for tests.
//!
//! Public (not `#[cfg(test)]`) so the integration tests under `tests/` can
//! drive the orchestrator with them.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use crate::embeddings::Embedder;
use crate::error::{AnalysisError, Result};
use crate::lexicon::RootExtractor;
use crate::model::{Coords, Sentiment};
use crate::reduction::{ReductionParams, Reducer};
use crate::sentiment::SentimentClassifier;

type Rule = Box<dyn Fn(&str) -> Vec<f32> + Send + Sync>;

/// Embedder computing each vector from its text with a fixed rule.
///
/// Records every batch it receives. With a gate, each call waits for a
/// semaphore permit first, which lets a test hold a run inside the
/// embedding stage.
pub struct StubEmbedder {
    rule: Rule,
    calls: Mutex<Vec<Vec<String>>>,
    gate: Option<Arc<Semaphore>>,
    failure: Option<String>,
}

impl StubEmbedder {
    pub fn new(rule: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static) -> Self {
        Self {
            rule: Box::new(rule),
            calls: Mutex::new(Vec::new()),
            gate: None,
            failure: None,
        }
    }

    /// Same vector for every text
    pub fn constant(vector: Vec<f32>) -> Self {
        Self::new(move |_| vector.clone())
    }

    /// `[len, 1.0]`, so order can be checked from the first component
    pub fn by_length() -> Self {
        Self::new(|t| vec![t.chars().count() as f32, 1.0])
    }

    /// Looks texts up in `script`, falling back to `default`
    pub fn scripted(script: &[(&str, Vec<f32>)], default: Vec<f32>) -> Self {
        let map: HashMap<String, Vec<f32>> =
            script.iter().map(|(t, v)| (t.to_string(), v.clone())).collect();
        Self::new(move |t| map.get(t).cloned().unwrap_or_else(|| default.clone()))
    }

    /// Every call fails with a service error carrying `message`
    pub fn failing(message: &str) -> Self {
        let mut stub = Self::constant(vec![1.0]);
        stub.failure = Some(message.to_string());
        stub
    }

    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Every text received, across calls, in call order
    pub fn seen_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(Vec::len).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|_| AnalysisError::ChannelClosed)?;
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(texts.to_vec());
        }
        if let Some(message) = &self.failure {
            return Err(AnalysisError::service("embedding", message.clone()));
        }
        Ok(texts.iter().map(|t| (self.rule)(t)).collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Reducer placing row `i` at `(i, i)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiagonalReducer;

impl Reducer for DiagonalReducer {
    fn reduce(&self, embeddings: &[Vec<f32>], _params: &ReductionParams) -> Result<Vec<Coords>> {
        Ok((0..embeddings.len())
            .map(|i| Coords {
                x: i as f32,
                y: i as f32,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "diagonal"
    }
}

/// Reducer whose first call blocks its worker thread until released.
///
/// Later calls run straight through. Rows are placed like [`DiagonalReducer`].
pub struct GatedReducer {
    entered: Arc<Notify>,
    release: Mutex<Option<mpsc::Receiver<()>>>,
}

/// Test-side handle of a [`GatedReducer`].
pub struct ReducerGate {
    entered: Arc<Notify>,
    release: mpsc::Sender<()>,
}

impl GatedReducer {
    pub fn new() -> (Self, ReducerGate) {
        let entered = Arc::new(Notify::new());
        let (tx, rx) = mpsc::channel();
        let reducer = Self {
            entered: Arc::clone(&entered),
            release: Mutex::new(Some(rx)),
        };
        (reducer, ReducerGate { entered, release: tx })
    }
}

impl ReducerGate {
    /// Resolves once the gated call has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        let _ = self.release.send(());
    }
}

impl Reducer for GatedReducer {
    fn reduce(&self, embeddings: &[Vec<f32>], params: &ReductionParams) -> Result<Vec<Coords>> {
        let held = self.release.lock().ok().and_then(|mut slot| slot.take());
        if let Some(release) = held {
            self.entered.notify_one();
            let _ = release.recv();
        }
        DiagonalReducer.reduce(embeddings, params)
    }

    fn name(&self) -> &str {
        "gated"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FailingReducer;

impl Reducer for FailingReducer {
    fn reduce(&self, _embeddings: &[Vec<f32>], _params: &ReductionParams) -> Result<Vec<Coords>> {
        Err(AnalysisError::Reduction("layout diverged".into()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSentiment;

#[async_trait]
impl SentimentClassifier for FailingSentiment {
    async fn classify_batch(&self, _texts: &[String]) -> Result<Vec<Sentiment>> {
        Err(AnalysisError::service("sentiment", "model unavailable"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FailingRoots;

impl RootExtractor for FailingRoots {
    fn roots(&self, _text: &str) -> Result<Vec<String>> {
        Err(AnalysisError::service("roots", "tagger crashed"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}
