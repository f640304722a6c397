//! Stage bodies run by the orchestrator's workers.
//!
//! Each takes its own copy of the rows and returns either the stage's
//! complete result or an error; nothing is written back here.

use std::time::Instant;

use tracing::info;

use crate::embeddings::{embed_in_batches, Embedder};
use crate::error::{AnalysisError, Result};
use crate::lexicon::{extract_roots, RootExtractor};
use crate::merge::{merge_rows, MergeOutcome};
use crate::model::{Coords, Row, Sentiment};
use crate::reduction::{ReductionParams, Reducer};
use crate::sentiment::{classify_in_batches, SentimentClassifier};

/// Batched embedding followed by the merge pass.
pub async fn embed_and_merge(
    mut rows: Vec<Row>,
    embedder: &dyn Embedder,
    batch_size: usize,
    threshold: f32,
) -> Result<MergeOutcome> {
    let start = Instant::now();
    let texts: Vec<String> = rows.iter().map(|r| r.text.clone()).collect();
    let vectors = embed_in_batches(embedder, &texts, batch_size).await?;
    for (row, v) in rows.iter_mut().zip(vectors) {
        row.embedding = Some(v);
    }
    info!(
        "Embedding completed - duration={:.2}s, rows={}, embedder={}",
        start.elapsed().as_secs_f32(),
        rows.len(),
        embedder.name()
    );

    merge_rows(rows, embedder, threshold).await
}

/// 2-D coordinates for every row, in row order.
pub fn reduce_rows(rows: &[Row], reducer: &dyn Reducer, params: &ReductionParams) -> Result<Vec<Coords>> {
    let embeddings = rows
        .iter()
        .map(|r| {
            r.embedding.clone().ok_or_else(|| {
                AnalysisError::Reduction(format!("row {} has no embedding", r.key()))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    reducer.reduce(&embeddings, params)
}

pub fn stem_rows(rows: &[Row], extractor: &dyn RootExtractor) -> Result<Vec<Vec<String>>> {
    let start = Instant::now();
    let roots = extract_roots(extractor, rows)?;
    info!(
        "Stemming completed - duration={:.2}s, rows={}, roots={}",
        start.elapsed().as_secs_f32(),
        rows.len(),
        roots.iter().map(Vec::len).sum::<usize>()
    );
    Ok(roots)
}

pub async fn classify_texts(
    texts: &[String],
    classifier: &dyn SentimentClassifier,
    batch_size: usize,
) -> Result<Vec<Sentiment>> {
    let start = Instant::now();
    let results = classify_in_batches(classifier, texts, batch_size).await?;
    info!(
        "Sentiment completed - duration={:.2}s, rows={}, classifier={}",
        start.elapsed().as_secs_f32(),
        texts.len(),
        classifier.name()
    );
    Ok(results)
}
