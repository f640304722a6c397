//! Principal component projection via power iteration.
//!
//! Works on whichever of the Gram matrix (n x n) or covariance matrix (d x d)
//! is smaller. Components are extracted one at a time, each kept orthogonal
//! to the ones already found.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::{AnalysisError, Result};

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE_TOL: f64 = 1e-10;

/// Project `data` (rows x dims) onto its top `components` principal axes.
pub fn project(data: &[Vec<f64>], components: usize, seed: u64) -> Result<Vec<Vec<f64>>> {
    let n = data.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let d = data[0].len();
    if components == 0 || d == 0 {
        return Err(AnalysisError::Reduction("PCA needs at least one component".into()));
    }
    let k = components.min(n).min(d);

    let centered = center(data);

    let scores = if n <= d {
        let gram = gram_matrix(&centered);
        let eig = top_eigenvectors(&gram, k, seed);
        (0..n)
            .map(|i| eig.iter().map(|(lambda, u)| u[i] * lambda.max(0.0).sqrt()).collect())
            .collect()
    } else {
        let cov = scatter_matrix(&centered, d);
        let eig = top_eigenvectors(&cov, k, seed);
        centered
            .iter()
            .map(|x| eig.iter().map(|(_, v)| dot(x, v)).collect())
            .collect()
    };

    Ok(scores)
}

fn center(data: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = data.len() as f64;
    let d = data[0].len();
    let mut mean = vec![0.0; d];
    for row in data {
        for (m, x) in mean.iter_mut().zip(row) {
            *m += x;
        }
    }
    for m in mean.iter_mut() {
        *m /= n;
    }
    data.iter()
        .map(|row| row.iter().zip(&mean).map(|(x, m)| x - m).collect())
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn gram_matrix(x: &[Vec<f64>]) -> Vec<Vec<f64>> {
    x.par_iter()
        .map(|xi| x.iter().map(|xj| dot(xi, xj)).collect())
        .collect()
}

fn scatter_matrix(x: &[Vec<f64>], d: usize) -> Vec<Vec<f64>> {
    let columns: Vec<Vec<f64>> = (0..d).map(|c| x.iter().map(|row| row[c]).collect()).collect();
    columns
        .par_iter()
        .map(|ca| columns.iter().map(|cb| dot(ca, cb)).collect())
        .collect()
}

fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.par_iter().map(|row| dot(row, v)).collect()
}

fn orthogonalize(v: &mut [f64], basis: &[(f64, Vec<f64>)]) {
    for (_, b) in basis {
        let proj = dot(v, b);
        for (x, y) in v.iter_mut().zip(b) {
            *x -= proj * y;
        }
    }
}

fn normalize(v: &mut [f64]) -> f64 {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    norm
}

/// Top-`k` (eigenvalue, unit eigenvector) pairs of a symmetric PSD matrix.
fn top_eigenvectors(m: &[Vec<f64>], k: usize, seed: u64) -> Vec<(f64, Vec<f64>)> {
    let size = m.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut found: Vec<(f64, Vec<f64>)> = Vec::with_capacity(k);

    for j in 0..k {
        let mut v: Vec<f64> = (0..size).map(|_| rng.gen_range(-1.0..1.0)).collect();
        orthogonalize(&mut v, &found);
        if normalize(&mut v) == 0.0 {
            v = vec![0.0; size];
            v[j % size] = 1.0;
            orthogonalize(&mut v, &found);
            normalize(&mut v);
        }

        let mut lambda = 0.0;
        for _ in 0..MAX_ITERATIONS {
            let mut w = mat_vec(m, &v);
            orthogonalize(&mut w, &found);
            lambda = dot(&v, &w);
            if normalize(&mut w) < 1e-12 {
                lambda = 0.0;
                break;
            }
            let delta = 1.0 - dot(&v, &w).abs();
            v = w;
            if delta < CONVERGENCE_TOL {
                break;
            }
        }

        // deterministic sign: largest-magnitude entry positive
        if let Some(max) = v
            .iter()
            .copied()
            .max_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap_or(std::cmp::Ordering::Equal))
        {
            if max < 0.0 {
                for x in v.iter_mut() {
                    *x = -*x;
                }
            }
        }

        found.push((lambda.max(0.0), v));
    }

    found
}
