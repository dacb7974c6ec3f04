pub mod libsvm;
pub mod synthetic;

pub use libsvm::{load_libsvm, parse_libsvm};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{OptimError, Result};
use crate::math::{self, Matrix};
use crate::metrics::margin_accuracy;
use crate::optim::Accuracy;

/// Labelled samples for binary classification. Rows of `features` are
/// samples and `labels` are `-1.0` or `+1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: Matrix,
    pub labels: Vec<f64>,
}

impl Dataset {
    pub fn new(features: Matrix, labels: Vec<f64>) -> Result<Self> {
        if features.rows != labels.len() {
            return Err(OptimError::invalid(format!(
                "{} feature rows but {} labels",
                features.rows,
                labels.len()
            )));
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.features.cols
    }

    /// `y_i * x_i^T w` for every sample.
    pub fn margins(&self, w: &[f64]) -> Vec<f64> {
        let mut m = self.features.matvec(w);
        for (mi, y) in m.iter_mut().zip(&self.labels) {
            *mi *= y;
        }
        m
    }

    /// Scale every nonzero row to unit Euclidean norm.
    pub fn normalize_rows(&mut self) {
        for r in 0..self.features.rows {
            let row = self.features.row_mut(r);
            let norm = math::norm_sq(row).sqrt();
            if norm > 0.0 {
                row.iter_mut().for_each(|x| *x /= norm);
            }
        }
    }

    /// Shuffle and split into `(train, test)` with `test_fraction` of the
    /// samples held out. A fraction of 0 returns an empty test set.
    pub fn split<R: Rng>(&self, test_fraction: f64, rng: &mut R) -> Result<(Dataset, Dataset)> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(OptimError::invalid(format!(
                "test_fraction must be in [0, 1), got {test_fraction}"
            )));
        }
        let mut idx: Vec<usize> = (0..self.len()).collect();
        idx.shuffle(rng);
        let n_test = (self.len() as f64 * test_fraction).round() as usize;
        let (test_idx, train_idx) = idx.split_at(n_test);
        Ok((self.subset(train_idx), self.subset(test_idx)))
    }

    pub fn subset(&self, idx: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select_rows(idx),
            labels: idx.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

impl Accuracy for Dataset {
    fn accuracy(&self, w: &[f64]) -> f64 {
        margin_accuracy(&self.margins(w))
    }
}
