//! Neighbourhood-preserving 2-D layout in the style of UMAP.
//!
//! 1. exact k-nearest neighbours (euclidean)
//! 2. smooth-kNN bandwidths and fuzzy membership strengths
//! 3. fuzzy union of the directed graph
//! 4. low-dimensional curve `1 / (1 + a d^2b)` fitted to `spread` / `min_dist`
//! 5. SGD with negative sampling from a PCA initialisation

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{pca, ReductionParams};
use crate::error::{AnalysisError, Result};

const SMOOTH_K_TOLERANCE: f64 = 1e-5;
const MIN_K_DIST_SCALE: f64 = 1e-3;
const BANDWIDTH_SEARCH_STEPS: usize = 64;
const NEGATIVE_SAMPLE_RATE: f64 = 5.0;
const GRADIENT_CLIP: f64 = 4.0;
const INIT_EXTENT: f64 = 10.0;

/// Lay out `data` in two dimensions using `k` neighbours.
pub fn layout(data: &[Vec<f64>], k: usize, params: &ReductionParams) -> Result<Vec<[f64; 2]>> {
    let n = data.len();
    match n {
        0 => return Ok(Vec::new()),
        1 => return Ok(vec![[0.0, 0.0]]),
        _ => {}
    }
    let k = k.min(n - 1).max(1);

    let knn = nearest_neighbors(data, k);
    let graph = fuzzy_graph(&knn, k);
    if graph.is_empty() {
        return Err(AnalysisError::Reduction("neighbour graph has no edges".into()));
    }

    let (a, b) = fit_curve(params.spread, params.min_dist);
    let mut embedding = initial_layout(data, params.seed)?;
    optimize(&mut embedding, &graph, a, b, params.epochs.max(1), params.seed);

    Ok(embedding)
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

/// For each point, its `k` nearest other points as (index, distance), ascending.
fn nearest_neighbors(data: &[Vec<f64>], k: usize) -> Vec<Vec<(usize, f64)>> {
    data.par_iter()
        .enumerate()
        .map(|(i, xi)| {
            let mut dists: Vec<(usize, f64)> = data
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, xj)| (j, euclidean(xi, xj)))
                .collect();
            dists.sort_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            });
            dists.truncate(k);
            dists
        })
        .collect()
}

/// Bandwidth `sigma` and local connectivity `rho` for one point.
fn smooth_knn(dists: &[(usize, f64)], k: usize, mean_dist: f64) -> (f64, f64) {
    let target = (k as f64).log2();
    let rho = dists
        .iter()
        .map(|(_, d)| *d)
        .find(|d| *d > 0.0)
        .unwrap_or(0.0);

    let mut lo = 0.0;
    let mut hi = f64::INFINITY;
    let mut mid = 1.0;

    for _ in 0..BANDWIDTH_SEARCH_STEPS {
        let psum: f64 = dists
            .iter()
            .map(|(_, d)| {
                let d = (d - rho).max(0.0);
                (-d / mid).exp()
            })
            .sum();

        if (psum - target).abs() < SMOOTH_K_TOLERANCE {
            break;
        }
        if psum > target {
            hi = mid;
            mid = (lo + hi) / 2.0;
        } else {
            lo = mid;
            mid = if hi.is_infinite() { mid * 2.0 } else { (lo + hi) / 2.0 };
        }
    }

    let floor = MIN_K_DIST_SCALE * if rho > 0.0 { rho } else { mean_dist };
    (mid.max(floor).max(f64::MIN_POSITIVE), rho)
}

/// Symmetric fuzzy union of directed memberships, as a list of directed edges.
fn fuzzy_graph(knn: &[Vec<(usize, f64)>], k: usize) -> Vec<(usize, usize, f64)> {
    let all: Vec<f64> = knn.iter().flatten().map(|(_, d)| *d).collect();
    let mean_dist = if all.is_empty() {
        1.0
    } else {
        all.iter().sum::<f64>() / all.len() as f64
    };

    let mut directed: HashMap<(usize, usize), f64> = HashMap::new();
    for (i, neighbors) in knn.iter().enumerate() {
        let (sigma, rho) = smooth_knn(neighbors, k, mean_dist);
        for &(j, d) in neighbors {
            let w = if d - rho <= 0.0 {
                1.0
            } else {
                (-(d - rho) / sigma).exp()
            };
            directed.insert((i, j), w);
        }
    }

    let mut edges: Vec<(usize, usize, f64)> = Vec::with_capacity(directed.len() * 2);
    let mut keys: Vec<&(usize, usize)> = directed.keys().collect();
    keys.sort();
    let mut seen = HashSet::new();
    for &(i, j) in keys {
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        if !seen.insert((lo, hi)) {
            continue;
        }
        let a = directed.get(&(lo, hi)).copied().unwrap_or(0.0);
        let b = directed.get(&(hi, lo)).copied().unwrap_or(0.0);
        let w = a + b - a * b;
        if w > 0.0 {
            edges.push((lo, hi, w));
            edges.push((hi, lo, w));
        }
    }
    edges
}

/// Fit `a`, `b` so that `1 / (1 + a x^2b)` approximates the target curve.
pub fn fit_curve(spread: f64, min_dist: f64) -> (f64, f64) {
    let xs: Vec<f64> = (1..=300).map(|i| i as f64 * spread * 3.0 / 300.0).collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| if x < min_dist { 1.0 } else { (-(x - min_dist) / spread).exp() })
        .collect();

    let loss = |a: f64, b: f64| -> f64 {
        xs.iter()
            .zip(&ys)
            .map(|(&x, &y)| {
                let f = 1.0 / (1.0 + a * x.powf(2.0 * b));
                (f - y) * (f - y)
            })
            .sum()
    };

    let mut best = (1.0, 1.0);
    let mut best_loss = f64::INFINITY;
    for bi in 0..=90 {
        let b = 0.2 + bi as f64 * 0.02;
        for ai in 0..=100 {
            let a = 10f64.powf(-3.0 + ai as f64 * 0.05);
            let l = loss(a, b);
            if l < best_loss {
                best_loss = l;
                best = (a, b);
            }
        }
    }

    // pattern search refinement
    let (mut a, mut b) = best;
    let mut step_a = a * 0.1;
    let mut step_b = 0.01;
    for _ in 0..60 {
        let mut improved = false;
        for (da, db) in [(step_a, 0.0), (-step_a, 0.0), (0.0, step_b), (0.0, -step_b)] {
            let (na, nb) = (a + da, b + db);
            if na <= 0.0 || nb <= 0.0 {
                continue;
            }
            let l = loss(na, nb);
            if l < best_loss {
                best_loss = l;
                a = na;
                b = nb;
                improved = true;
            }
        }
        if !improved {
            step_a /= 2.0;
            step_b /= 2.0;
        }
    }

    (a, b)
}

fn initial_layout(data: &[Vec<f64>], seed: u64) -> Result<Vec<[f64; 2]>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let projected = pca::project(data, 2, seed)?;

    let mut points: Vec<[f64; 2]> = projected
        .iter()
        .map(|p| [p.first().copied().unwrap_or(0.0), p.get(1).copied().unwrap_or(0.0)])
        .collect();

    let max_abs = points
        .iter()
        .flat_map(|p| p.iter())
        .fold(0.0f64, |m, v| m.max(v.abs()));

    if max_abs > 1e-12 {
        let scale = INIT_EXTENT / max_abs;
        for p in points.iter_mut() {
            p[0] = p[0] * scale + rng.gen_range(-1e-4..1e-4);
            p[1] = p[1] * scale + rng.gen_range(-1e-4..1e-4);
        }
    } else {
        for p in points.iter_mut() {
            *p = [
                rng.gen_range(-INIT_EXTENT..INIT_EXTENT),
                rng.gen_range(-INIT_EXTENT..INIT_EXTENT),
            ];
        }
    }

    Ok(points)
}

fn clip(v: f64) -> f64 {
    v.clamp(-GRADIENT_CLIP, GRADIENT_CLIP)
}

fn optimize(embedding: &mut [[f64; 2]], graph: &[(usize, usize, f64)], a: f64, b: f64, epochs: usize, seed: u64) {
    let n = embedding.len();
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));

    let max_w = graph.iter().map(|e| e.2).fold(0.0f64, f64::max);
    let edges: Vec<(usize, usize, f64)> = graph
        .iter()
        .filter(|e| e.2 >= max_w / epochs as f64)
        .map(|&(h, t, w)| (h, t, max_w / w))
        .collect();

    let mut next_sample: Vec<f64> = edges.iter().map(|e| e.2).collect();
    let neg_interval: Vec<f64> = edges.iter().map(|e| e.2 / NEGATIVE_SAMPLE_RATE).collect();
    let mut next_negative: Vec<f64> = neg_interval.clone();

    for epoch in 0..epochs {
        let alpha = 1.0 - epoch as f64 / epochs as f64;
        let epoch_f = epoch as f64;

        for (e, &(head, tail, interval)) in edges.iter().enumerate() {
            if next_sample[e] > epoch_f {
                continue;
            }

            let current = embedding[head];
            let other = embedding[tail];
            let dist2 = (current[0] - other[0]).powi(2) + (current[1] - other[1]).powi(2);
            let coeff = if dist2 > 0.0 {
                (-2.0 * a * b * dist2.powf(b - 1.0)) / (a * dist2.powf(b) + 1.0)
            } else {
                0.0
            };
            for d in 0..2 {
                let grad = clip(coeff * (current[d] - other[d]));
                embedding[head][d] += grad * alpha;
                embedding[tail][d] -= grad * alpha;
            }
            next_sample[e] += interval;

            let n_neg = ((epoch_f - next_negative[e]) / neg_interval[e]).max(0.0) as usize;
            for _ in 0..n_neg {
                let k = rng.gen_range(0..n);
                if k == head {
                    continue;
                }
                let current = embedding[head];
                let other = embedding[k];
                let dist2 = (current[0] - other[0]).powi(2) + (current[1] - other[1]).powi(2);
                let coeff = if dist2 > 0.0 {
                    2.0 * b / ((0.001 + dist2) * (a * dist2.powf(b) + 1.0))
                } else {
                    0.0
                };
                for d in 0..2 {
                    let grad = if coeff > 0.0 {
                        clip(coeff * (current[d] - other[d]))
                    } else {
                        GRADIENT_CLIP
                    };
                    embedding[head][d] += grad * alpha;
                }
            }
            next_negative[e] += n_neg as f64 * neg_interval[e];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centroid(points: &[[f64; 2]]) -> [f64; 2] {
        let n = points.len() as f64;
        [
            points.iter().map(|p| p[0]).sum::<f64>() / n,
            points.iter().map(|p| p[1]).sum::<f64>() / n,
        ]
    }

    fn dist(a: [f64; 2], b: [f64; 2]) -> f64 {
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
    }

    #[test]
    fn test_fit_curve_matches_reference_values() {
        // reference UMAP fit for spread=1, min_dist=0.1 is roughly a=1.58, b=0.90
        let (a, b) = fit_curve(1.0, 0.1);
        assert!((a - 1.58).abs() < 0.3, "a = {}", a);
        assert!((b - 0.90).abs() < 0.15, "b = {}", b);
    }

    #[test]
    fn test_smooth_knn_hits_log2_k() {
        let dists = vec![(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)];
        let (sigma, rho) = smooth_knn(&dists, 4, 2.5);
        assert_eq!(rho, 1.0);
        let psum: f64 = dists.iter().map(|(_, d)| (-(d - rho).max(0.0) / sigma).exp()).sum();
        assert!((psum - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_fuzzy_graph_is_symmetric() {
        let data: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, (i * i) as f64 * 0.1]).collect();
        let knn = nearest_neighbors(&data, 2);
        let graph = fuzzy_graph(&knn, 2);
        for &(i, j, w) in &graph {
            assert!(graph.iter().any(|&(a, b, v)| a == j && b == i && (v - w).abs() < 1e-12));
            assert!(w > 0.0 && w <= 1.0);
        }
    }

    #[test]
    fn test_layout_separates_clusters() {
        let mut data = Vec::new();
        for i in 0..10 {
            data.push(vec![0.0 + 0.01 * i as f64, 0.0, 0.0]);
        }
        for i in 0..10 {
            data.push(vec![10.0 + 0.01 * i as f64, 10.0, 10.0]);
        }
        let params = ReductionParams {
            epochs: 100,
            ..Default::default()
        };
        let out = layout(&data, 5, &params).unwrap();
        let ca = centroid(&out[..10]);
        let cb = centroid(&out[10..]);
        let spread_a = out[..10].iter().map(|p| dist(*p, ca)).fold(0.0, f64::max);
        assert!(dist(ca, cb) > spread_a);
    }

    #[test]
    fn test_layout_handles_duplicates() {
        let data = vec![vec![1.0, 1.0]; 4];
        let out = layout(&data, 3, &ReductionParams::default()).unwrap();
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|p| p[0].is_finite() && p[1].is_finite()));
    }

    #[test]
    fn test_two_points() {
        let data = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let out = layout(&data, 2, &ReductionParams::default()).unwrap();
        assert_eq!(out.len(), 2);
    }
}
