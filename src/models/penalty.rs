//! Nonsmooth penalties `g` and their proximal operators.

use crate::config::PenaltyKind;
use crate::optim::Regularizer;

/// `g = 0`; the prox is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPenalty;

impl Regularizer for NoPenalty {
    fn prox(&self, x: &[f64], _step: f64) -> Vec<f64> {
        x.to_vec()
    }

    fn value(&self, _w: &[f64]) -> f64 {
        0.0
    }
}

/// `g(w) = ||w||_1`, prox by soft thresholding.
#[derive(Debug, Clone, Copy, Default)]
pub struct L1Norm;

impl Regularizer for L1Norm {
    fn prox(&self, x: &[f64], step: f64) -> Vec<f64> {
        x.iter()
            .map(|&xi| xi.signum() * (xi.abs() - step).max(0.0))
            .collect()
    }

    fn value(&self, w: &[f64]) -> f64 {
        w.iter().map(|x| x.abs()).sum()
    }
}

/// `g(w) = 0.5 * ||w||^2`, prox by uniform shrinkage.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredL2;

impl Regularizer for SquaredL2 {
    fn prox(&self, x: &[f64], step: f64) -> Vec<f64> {
        let s = 1.0 / (1.0 + step);
        x.iter().map(|&xi| xi * s).collect()
    }

    fn value(&self, w: &[f64]) -> f64 {
        0.5 * w.iter().map(|x| x * x).sum::<f64>()
    }
}

/// Indicator of the nonnegative orthant. The prox is the projection and
/// ignores the step; the value is infinite outside the orthant.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonNegative;

impl Regularizer for NonNegative {
    fn prox(&self, x: &[f64], _step: f64) -> Vec<f64> {
        x.iter().map(|&xi| xi.max(0.0)).collect()
    }

    fn value(&self, w: &[f64]) -> f64 {
        if w.iter().all(|&x| x >= 0.0) {
            0.0
        } else {
            f64::INFINITY
        }
    }
}

/// Penalty selected by a run configuration.
pub fn penalty_for(kind: PenaltyKind) -> Box<dyn Regularizer> {
    match kind {
        PenaltyKind::None => Box::new(NoPenalty),
        PenaltyKind::L1 => Box::new(L1Norm),
        PenaltyKind::L2 => Box::new(SquaredL2),
        PenaltyKind::NonNegative => Box::new(NonNegative),
    }
}
