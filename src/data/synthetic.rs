use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};

use crate::error::{OptimError, Result};
use crate::math::{self, Matrix};

use super::Dataset;

/// Linearly separable problem with label noise: features and a hidden
/// direction `w*` are standard normal and `y = sign(x^T w* + noise * e)`.
pub fn classification<R: Rng>(n: usize, d: usize, noise: f64, rng: &mut R) -> Result<Dataset> {
    if n == 0 || d == 0 {
        return Err(OptimError::invalid(format!(
            "synthetic data needs n > 0 and d > 0, got n={n} d={d}"
        )));
    }
    let eps = Normal::new(0.0, noise.max(0.0))
        .map_err(|e| OptimError::invalid(format!("bad noise level {noise}: {e}")))?;
    let w_star: Vec<f64> = (0..d).map(|_| StandardNormal.sample(rng)).collect();
    let features = centers(n, d, rng);
    let labels = (0..n)
        .map(|i| {
            let score = math::dot(features.row(i), &w_star) + eps.sample(rng);
            if score >= 0.0 {
                1.0
            } else {
                -1.0
            }
        })
        .collect();
    Dataset::new(features, labels)
}

/// `n x d` matrix of standard normal entries.
pub fn centers<R: Rng>(n: usize, d: usize, rng: &mut R) -> Matrix {
    let data: Vec<f64> = (0..n * d).map(|_| StandardNormal.sample(rng)).collect();
    Matrix::from_vec(n, d, data)
}
