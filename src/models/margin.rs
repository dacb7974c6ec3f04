//! Linear classifiers trained through a loss on the margin `m = y x^T w`.

use crate::data::Dataset;
use crate::math;
use crate::optim::{FullGradient, SmoothLoss};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginKind {
    /// `log(1 + exp(-m))`
    Logistic,
    /// `1 - tanh(m)`, nonconvex and bounded.
    Tanh,
}

impl MarginKind {
    fn value(self, m: f64) -> f64 {
        match self {
            MarginKind::Logistic => {
                if m > 0.0 {
                    (-m).exp().ln_1p()
                } else {
                    -m + m.exp().ln_1p()
                }
            }
            MarginKind::Tanh => 1.0 - m.tanh(),
        }
    }

    fn derivative(self, m: f64) -> f64 {
        match self {
            MarginKind::Logistic => -1.0 / (1.0 + m.exp()),
            MarginKind::Tanh => {
                let t = m.tanh();
                t * t - 1.0
            }
        }
    }

    /// Bound on the second derivative of the scalar loss.
    fn curvature(self) -> f64 {
        match self {
            MarginKind::Logistic => 0.25,
            MarginKind::Tanh => 4.0 / (3.0 * 3f64.sqrt()),
        }
    }
}

/// `f(w) = (1/n) sum_i phi(y_i x_i^T w)` over a borrowed [`Dataset`].
pub struct MarginLoss<'a> {
    data: &'a Dataset,
    kind: MarginKind,
}

impl<'a> MarginLoss<'a> {
    pub fn new(data: &'a Dataset, kind: MarginKind) -> Self {
        Self { data, kind }
    }

    pub fn kind(&self) -> MarginKind {
        self.kind
    }

    fn margin(&self, i: usize, w: &[f64]) -> f64 {
        self.data.labels[i] * math::dot(self.data.features.row(i), w)
    }

    /// Adds `scale * phi'(m_i) * y_i * x_i` to `out`.
    fn accumulate(&self, i: usize, m: f64, scale: f64, out: &mut [f64]) {
        let coef = scale * self.kind.derivative(m) * self.data.labels[i];
        math::axpy(coef, self.data.features.row(i), out);
    }
}

impl SmoothLoss for MarginLoss<'_> {
    fn num_samples(&self) -> usize {
        self.data.len()
    }

    fn dim(&self) -> usize {
        self.data.dim()
    }

    fn gradient(&self, w: &[f64], batch: &[usize]) -> Vec<f64> {
        let mut g = vec![0.0; self.dim()];
        let scale = 1.0 / batch.len() as f64;
        for &i in batch {
            let m = self.margin(i, w);
            self.accumulate(i, m, scale, &mut g);
        }
        g
    }

    fn gradient_difference(&self, w_prev: &[f64], w: &[f64], batch: &[usize]) -> Vec<f64> {
        let mut g = vec![0.0; self.dim()];
        let scale = 1.0 / batch.len() as f64;
        for &i in batch {
            let m = self.margin(i, w);
            let m_prev = self.margin(i, w_prev);
            let coef = scale
                * (self.kind.derivative(m) - self.kind.derivative(m_prev))
                * self.data.labels[i];
            math::axpy(coef, self.data.features.row(i), &mut g);
        }
        g
    }

    fn full_gradient(&self, w: &[f64]) -> FullGradient {
        let margins = self.data.margins(w);
        let mut g = vec![0.0; self.dim()];
        let scale = 1.0 / margins.len() as f64;
        for (i, &m) in margins.iter().enumerate() {
            self.accumulate(i, m, scale, &mut g);
        }
        FullGradient {
            gradient: g,
            predictions: margins,
        }
    }

    fn loss(&self, _w: &[f64], predictions: &[f64]) -> f64 {
        let total: f64 = predictions.iter().map(|&m| self.kind.value(m)).sum();
        total / predictions.len() as f64
    }

    fn lipschitz(&self) -> Option<f64> {
        let l = self.kind.curvature() * self.data.features.max_row_norm_sq();
        (l > 0.0).then_some(l)
    }
}
