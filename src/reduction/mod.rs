pub mod pca;
pub mod umap;

use tracing::{debug, info};

use crate::config::ReductionConfig;
use crate::error::{AnalysisError, Result};
use crate::model::Coords;

/// Row count above which PCA always targets the coarsest dimensionality
pub const LARGE_CORPUS_ROWS: usize = 1920;

#[derive(Debug, Clone, PartialEq)]
pub struct ReductionParams {
    pub pca_cutoff: usize,
    pub max_neighbors: usize,
    pub spread: f64,
    pub min_dist: f64,
    pub epochs: usize,
    pub seed: u64,
}

impl From<&ReductionConfig> for ReductionParams {
    fn from(c: &ReductionConfig) -> Self {
        Self {
            pca_cutoff: c.pca_cutoff,
            max_neighbors: c.max_neighbors,
            spread: c.spread as f64,
            min_dist: c.min_dist as f64,
            epochs: c.epochs,
            seed: c.seed,
        }
    }
}

impl Default for ReductionParams {
    fn default() -> Self {
        Self::from(&ReductionConfig::default())
    }
}

/// Projects N equal-length vectors to N 2-D points, same order.
///
/// All-or-nothing: an error means no coordinates at all.
pub trait Reducer: Send + Sync {
    fn reduce(&self, embeddings: &[Vec<f32>], params: &ReductionParams) -> Result<Vec<Coords>>;

    fn name(&self) -> &str;
}

/// PCA target dimensionality, or `None` when the input is small enough to
/// go straight to the layout step.
pub fn pca_target(rows: usize, dim: usize, cutoff: usize) -> Option<usize> {
    if dim <= cutoff {
        return None;
    }
    let target = if rows > LARGE_CORPUS_ROWS {
        12
    } else if dim > 960 {
        24
    } else if dim > 480 {
        48
    } else if dim > 240 {
        96
    } else {
        192
    };
    Some(target)
}

/// Neighbour count for the layout step: `min(max, rows - 1)`, at least 2.
pub fn neighbor_count(rows: usize, max_neighbors: usize) -> usize {
    max_neighbors.min(rows.saturating_sub(1)).max(2)
}

/// PCA followed by a UMAP-style fuzzy-graph layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcaUmapReducer;

impl Reducer for PcaUmapReducer {
    fn reduce(&self, embeddings: &[Vec<f32>], params: &ReductionParams) -> Result<Vec<Coords>> {
        let start = std::time::Instant::now();
        let n = embeddings.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let dim = embeddings[0].len();
        if dim == 0 {
            return Err(AnalysisError::Reduction("embeddings are empty".into()));
        }
        for (i, e) in embeddings.iter().enumerate() {
            if e.len() != dim {
                return Err(AnalysisError::Reduction(format!(
                    "embedding {} has dimension {}, expected {}",
                    i,
                    e.len(),
                    dim
                )));
            }
            if e.iter().any(|x| !x.is_finite()) {
                return Err(AnalysisError::Reduction(format!(
                    "embedding {} contains non-finite values",
                    i
                )));
            }
        }

        let mut data: Vec<Vec<f64>> = embeddings
            .iter()
            .map(|e| e.iter().map(|&x| x as f64).collect())
            .collect();

        if let Some(target) = pca_target(n, dim, params.pca_cutoff) {
            let components = target.min(dim).min(n);
            debug!(
                "PCA pre-reduction - rows={}, dim={}, target={}, components={}",
                n, dim, target, components
            );
            data = pca::project(&data, components, params.seed)?;
        }

        let k = neighbor_count(n, params.max_neighbors);
        let layout = umap::layout(&data, k, params)?;

        let coords: Vec<Coords> = layout
            .into_iter()
            .map(|[x, y]| Coords {
                x: x as f32,
                y: y as f32,
            })
            .collect();
        if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(AnalysisError::Reduction("layout produced non-finite coordinates".into()));
        }

        info!(
            "Reduction completed - duration={:.2}s, rows={}, input_dim={}, neighbors={}",
            start.elapsed().as_secs_f32(),
            n,
            dim,
            k
        );
        Ok(coords)
    }

    fn name(&self) -> &str {
        "pca-umap"
    }
}
