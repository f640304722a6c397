pub mod hashing;
pub mod provider;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{AnalysisError, Result};

pub use hashing::HashingEmbedder;
pub use provider::EmbeddingProvider;

/// Maps strings to fixed-length vectors.
///
/// Implementations must return one vector per input, in input order, all of
/// the same dimensionality.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let batch = self.embed_batch(&[text.to_string()]).await?;
        let vectors = validate_vectors(1, batch, None)?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::service("embedding", "no embedding returned"))
    }

    fn name(&self) -> &str;
}

/// Cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Check a service response: `expected` vectors, one shared non-zero
/// dimensionality (equal to `dim` when given), finite values only.
pub fn validate_vectors(
    expected: usize,
    vectors: Vec<Vec<f32>>,
    dim: Option<usize>,
) -> Result<Vec<Vec<f32>>> {
    if vectors.len() != expected {
        return Err(AnalysisError::service(
            "embedding",
            format!("expected {} vectors, got {}", expected, vectors.len()),
        ));
    }
    let want = match dim.or_else(|| vectors.first().map(Vec::len)) {
        Some(0) => {
            return Err(AnalysisError::service("embedding", "returned empty vectors"));
        }
        Some(d) => d,
        None => return Ok(vectors),
    };
    for (i, v) in vectors.iter().enumerate() {
        if v.len() != want {
            return Err(AnalysisError::service(
                "embedding",
                format!("vector {} has dimension {}, expected {}", i, v.len(), want),
            ));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(AnalysisError::service(
                "embedding",
                format!("vector {} contains non-finite values", i),
            ));
        }
    }
    Ok(vectors)
}

/// Embed `texts` in fixed-size batches, reassembling results in input order.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut out: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    let mut dim: Option<usize> = None;

    for (n, chunk) in texts.chunks(batch_size).enumerate() {
        debug!("Embedding batch {} - size={}", n + 1, chunk.len());
        let vectors = embedder.embed_batch(chunk).await?;
        let vectors = validate_vectors(chunk.len(), vectors, dim)?;
        if dim.is_none() {
            dim = vectors.first().map(Vec::len);
        }
        out.extend(vectors);
    }

    Ok(out)
}
