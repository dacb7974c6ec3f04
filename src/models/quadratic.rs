use crate::math::{self, Matrix};
use crate::optim::{FullGradient, SmoothLoss};

/// `f_i(w) = 0.5 * ||w - c_i||^2` for the rows `c_i` of `centers`.
///
/// The minimizer of `f` is the mean center, which makes the closed-form
/// behaviour of the drivers easy to check.
pub struct QuadraticLoss {
    centers: Matrix,
}

impl QuadraticLoss {
    pub fn new(centers: Matrix) -> Self {
        Self { centers }
    }

    pub fn centers(&self) -> &Matrix {
        &self.centers
    }

    /// Mean of the centers over `batch`.
    fn mean_center(&self, batch: &[usize]) -> Vec<f64> {
        let mut c = vec![0.0; self.centers.cols];
        let scale = 1.0 / batch.len() as f64;
        for &i in batch {
            math::axpy(scale, self.centers.row(i), &mut c);
        }
        c
    }
}

impl SmoothLoss for QuadraticLoss {
    fn num_samples(&self) -> usize {
        self.centers.rows
    }

    fn dim(&self) -> usize {
        self.centers.cols
    }

    fn gradient(&self, w: &[f64], batch: &[usize]) -> Vec<f64> {
        let mut g = w.to_vec();
        math::axpy(-1.0, &self.mean_center(batch), &mut g);
        g
    }

    fn gradient_difference(&self, w_prev: &[f64], w: &[f64], _batch: &[usize]) -> Vec<f64> {
        w.iter().zip(w_prev).map(|(a, b)| a - b).collect()
    }

    fn full_gradient(&self, w: &[f64]) -> FullGradient {
        let all: Vec<usize> = (0..self.centers.rows).collect();
        let predictions = (0..self.centers.rows)
            .map(|i| {
                let r = self.centers.row(i);
                0.5 * w.iter().zip(r).map(|(a, b)| (a - b) * (a - b)).sum::<f64>()
            })
            .collect();
        FullGradient {
            gradient: self.gradient(w, &all),
            predictions,
        }
    }

    fn loss(&self, _w: &[f64], predictions: &[f64]) -> f64 {
        predictions.iter().sum::<f64>() / predictions.len() as f64
    }

    fn lipschitz(&self) -> Option<f64> {
        Some(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_points_away_from_mean() {
        let c = Matrix::from_rows(&[vec![1.0, 0.0], vec![3.0, 2.0]]);
        let q = QuadraticLoss::new(c);
        let full = q.full_gradient(&[0.0, 0.0]);
        assert_eq!(full.gradient, vec![-2.0, -1.0]);
        assert_eq!(full.predictions, vec![0.5, 6.5]);
        assert_eq!(q.loss(&[0.0, 0.0], &full.predictions), 3.5);
        assert_eq!(q.gradient(&[0.0, 0.0], &[1]), vec![-3.0, -2.0]);
    }
}
