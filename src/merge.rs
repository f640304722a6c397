//! Collapses over-segmented sentences of one response.
//!
//! Rows live in an arena addressed by their original position. The pass walks
//! handles from the tail to the head; for each live row it scans backwards
//! through the same response-id run and folds the row into the first earlier
//! row whose embedding similarity exceeds the threshold. The absorbed slot is
//! tombstoned, so handles never shift while the pass is running. Rows before
//! the current handle are never tombstoned, which is what lets a chain of
//! near-duplicates collapse onto the earliest row of the run.

use serde::Serialize;
use tracing::{debug, info};

use crate::embeddings::{cosine_similarity, Embedder};
use crate::error::{AnalysisError, Result};
use crate::model::{Row, RowKey};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub rows: Vec<Row>,
    /// Keys retired by merging, in the order they were absorbed
    pub retired: Vec<RowKey>,
}

impl MergeOutcome {
    pub fn merges(&self) -> usize {
        self.retired.len()
    }
}

struct RowArena {
    slots: Vec<Option<Row>>,
}

impl RowArena {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            slots: rows.into_iter().map(Some).collect(),
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn take(&mut self, handle: usize) -> Option<Row> {
        self.slots.get_mut(handle).and_then(Option::take)
    }

    fn restore(&mut self, handle: usize, row: Row) {
        self.slots[handle] = Some(row);
    }

    fn get_mut(&mut self, handle: usize) -> Option<&mut Row> {
        self.slots.get_mut(handle).and_then(Option::as_mut)
    }

    fn into_rows(self) -> Vec<Row> {
        self.slots.into_iter().flatten().collect()
    }
}

fn embedding_of(row: &Row) -> Result<&[f32]> {
    row.embedding.as_deref().ok_or_else(|| {
        AnalysisError::service("merge", format!("row {} has no embedding", row.key()))
    })
}

/// Run one right-to-left merge pass.
///
/// Every merge re-embeds the concatenated text; merges are sequential because
/// a later comparison in the same run may see the text produced by an earlier one.
pub async fn merge_rows(rows: Vec<Row>, embedder: &dyn Embedder, threshold: f32) -> Result<MergeOutcome> {
    let start = std::time::Instant::now();
    let before = rows.len();
    let mut arena = RowArena::new(rows);
    let mut retired = Vec::new();

    for handle in (1..arena.len()).rev() {
        let Some(current) = arena.take(handle) else {
            continue;
        };

        let mut absorbed = false;
        for target_handle in (0..handle).rev() {
            let Some(target) = arena.get_mut(target_handle) else {
                continue;
            };
            if target.id != current.id {
                break;
            }

            let sim = cosine_similarity(embedding_of(&current)?, embedding_of(target)?);
            if sim <= threshold {
                continue;
            }

            debug!(
                "Merging {} into {} - similarity={:.3}",
                current.key(),
                target.key(),
                sim
            );
            let dim = embedding_of(target)?.len();
            target.text = format!("{} {}", target.text, current.text);
            let embedding = embedder.embed(&target.text).await?;
            if embedding.len() != dim {
                return Err(AnalysisError::service(
                    "embedding",
                    format!("re-embedding returned dimension {}, expected {}", embedding.len(), dim),
                ));
            }
            target.embedding = Some(embedding);
            retired.push(current.key());
            absorbed = true;
            break;
        }

        if !absorbed {
            arena.restore(handle, current);
        }
    }

    let rows = arena.into_rows();
    info!(
        "Merge completed - duration={:.2}s, merges={}, rows={} -> {}",
        start.elapsed().as_secs_f32(),
        retired.len(),
        before,
        rows.len()
    );
    Ok(MergeOutcome { rows, retired })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubEmbedder;

    fn row(id: i64, idx: usize, text: &str, emb: Vec<f32>) -> Row {
        let mut r = Row::new(id, idx, text, "parents");
        r.embedding = Some(emb);
        r
    }

    #[tokio::test]
    async fn test_three_identical_collapse_in_order() {
        let rows = vec![
            row(1, 0, "A.", vec![1.0, 0.0]),
            row(1, 1, "B.", vec![1.0, 0.0]),
            row(1, 2, "C.", vec![1.0, 0.0]),
        ];
        let embedder = StubEmbedder::constant(vec![1.0, 0.0]);
        let out = merge_rows(rows, &embedder, 0.4).await.unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].text, "A. B. C.");
        assert_eq!(out.rows[0].sentence_index, 0);
        assert_eq!(
            out.retired,
            vec![
                RowKey { id: 1, sentence_index: 2 },
                RowKey { id: 1, sentence_index: 1 }
            ]
        );
        // one re-embedding per merge, each with the concatenated text
        assert_eq!(embedder.seen_texts(), vec!["B. C.", "A. B. C."]);
    }

    #[tokio::test]
    async fn test_no_similar_pairs_leaves_rows_unchanged() {
        let rows = vec![
            row(1, 0, "A.", vec![1.0, 0.0]),
            row(1, 1, "B.", vec![0.0, 1.0]),
            row(2, 0, "C.", vec![1.0, 0.0]),
        ];
        let embedder = StubEmbedder::constant(vec![1.0, 0.0]);
        let out = merge_rows(rows.clone(), &embedder, 0.4).await.unwrap();
        assert_eq!(out.rows, rows);
        assert_eq!(out.merges(), 0);
        assert!(embedder.seen_texts().is_empty());
    }

    #[tokio::test]
    async fn test_never_merges_across_response_ids() {
        let rows = vec![row(1, 0, "A.", vec![1.0, 0.0]), row(2, 0, "B.", vec![1.0, 0.0])];
        let embedder = StubEmbedder::constant(vec![1.0, 0.0]);
        let out = merge_rows(rows, &embedder, 0.4).await.unwrap();
        assert_eq!(out.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_threshold_is_strict() {
        // similarity equal to the threshold is not a merge
        let rows = vec![row(1, 0, "A.", vec![1.0, 0.0]), row(1, 1, "B.", vec![1.0, 0.0])];
        let embedder = StubEmbedder::constant(vec![1.0, 0.0]);
        let out = merge_rows(rows, &embedder, 1.0).await.unwrap();
        assert_eq!(out.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_skips_dissimilar_neighbor_to_reach_earlier_row() {
        let rows = vec![
            row(1, 0, "A.", vec![1.0, 0.0]),
            row(1, 1, "B.", vec![0.0, 1.0]),
            row(1, 2, "C.", vec![1.0, 0.0]),
        ];
        // re-embedding of "A. C." stays orthogonal to B
        let embedder = StubEmbedder::constant(vec![1.0, 0.0]);
        let out = merge_rows(rows, &embedder, 0.4).await.unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].text, "A. C.");
        assert_eq!(out.rows[1].text, "B.");
    }

    #[tokio::test]
    async fn test_reembedding_feeds_later_comparisons() {
        // B~C merge; the merged text's new embedding is orthogonal to A, so A stays alone
        let rows = vec![
            row(1, 0, "A.", vec![1.0, 0.0]),
            row(1, 1, "B.", vec![0.7, 0.7]),
            row(1, 2, "C.", vec![0.7, 0.7]),
        ];
        let embedder = StubEmbedder::constant(vec![0.0, 1.0]);
        let out = merge_rows(rows, &embedder, 0.4).await.unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[1].text, "B. C.");
        assert_eq!(out.rows[1].embedding.as_deref(), Some(&[0.0, 1.0][..]));
    }

    #[tokio::test]
    async fn test_single_sentence_response_never_merges() {
        let rows = vec![row(5, 0, "Only.", vec![1.0])];
        let embedder = StubEmbedder::constant(vec![1.0]);
        let out = merge_rows(rows, &embedder, 0.4).await.unwrap();
        assert_eq!(out.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_embedding_is_error() {
        let rows = vec![row(1, 0, "A.", vec![1.0]), Row::new(1, 1, "B.", "x")];
        let embedder = StubEmbedder::constant(vec![1.0]);
        assert!(merge_rows(rows, &embedder, 0.4).await.is_err());
    }

    #[tokio::test]
    async fn test_reembedding_dimension_change_is_error() {
        let rows = vec![row(1, 0, "A.", vec![1.0, 0.0]), row(1, 1, "B.", vec![1.0, 0.0])];
        let embedder = StubEmbedder::constant(vec![1.0, 0.0, 0.0]);
        let err = merge_rows(rows, &embedder, 0.4).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Service { .. }));
    }
}
