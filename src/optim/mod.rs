pub mod diagnostics;
pub mod history;
pub mod prox_sarah;
pub mod prox_sgd;
pub mod step_size;

pub use diagnostics::gradient_mapping_norm_sq;
pub use history::{History, Snapshot};
pub use prox_sarah::ProxSarah;
pub use prox_sgd::ProxSgd;
pub use step_size::{AdaptiveStepSizes, DiminishingLr, LearningRateSchedule};

use rand::Rng;

use crate::error::Result;
use crate::math;

/// Output of a full-batch gradient evaluation.
///
/// `predictions` holds one value per sample (margins for linear classifiers)
/// so the loss and the train accuracy can be computed without another pass
/// over the data.
#[derive(Debug, Clone, PartialEq)]
pub struct FullGradient {
    pub gradient: Vec<f64>,
    pub predictions: Vec<f64>,
}

/// Smooth finite-sum part `f(w) = (1/n) sum_i f_i(w)` of the objective.
pub trait SmoothLoss {
    /// Number of samples `n`.
    fn num_samples(&self) -> usize;

    /// Dimension `d` of the iterate.
    fn dim(&self) -> usize;

    /// Mean gradient of `f_i` over the given sample indices.
    fn gradient(&self, w: &[f64], batch: &[usize]) -> Vec<f64>;

    /// `grad f_S(w) - grad f_S(w_prev)` evaluated on the same index set `S`.
    ///
    /// Implementations can override this to share work between the two
    /// evaluations.
    fn gradient_difference(&self, w_prev: &[f64], w: &[f64], batch: &[usize]) -> Vec<f64> {
        let mut diff = self.gradient(w, batch);
        let prev = self.gradient(w_prev, batch);
        math::axpy(-1.0, &prev, &mut diff);
        diff
    }

    /// Gradient over all `n` samples together with per-sample predictions.
    fn full_gradient(&self, w: &[f64]) -> FullGradient;

    /// Value of `f` at `w`; `predictions` come from [`SmoothLoss::full_gradient`]
    /// at the same point.
    fn loss(&self, w: &[f64], predictions: &[f64]) -> f64;

    /// Lipschitz constant of the component gradients, when the loss knows it.
    fn lipschitz(&self) -> Option<f64> {
        None
    }
}

/// Nonsmooth part `g` with a tractable proximal operator.
pub trait Regularizer {
    /// `argmin_u step * g(u) + 0.5 * ||u - x||^2`
    fn prox(&self, x: &[f64], step: f64) -> Vec<f64>;

    /// `g(w)`, not scaled by the penalty weight.
    fn value(&self, w: &[f64]) -> f64;
}

/// Held-out classification accuracy of an iterate, in `[0, 1]`.
pub trait Accuracy {
    fn accuracy(&self, w: &[f64]) -> f64;
}

/// The collaborators a driver needs for one run.
pub struct CompositeProblem<'a, L: ?Sized, G: ?Sized> {
    pub loss: &'a L,
    pub regularizer: &'a G,
    pub accuracy: Option<&'a dyn Accuracy>,
}

impl<'a, L, G> CompositeProblem<'a, L, G>
where
    L: SmoothLoss + ?Sized,
    G: Regularizer + ?Sized,
{
    pub fn new(loss: &'a L, regularizer: &'a G) -> Self {
        Self {
            loss,
            regularizer,
            accuracy: None,
        }
    }

    /// Report test accuracy through `accuracy` at every checkpoint.
    pub fn with_accuracy(mut self, accuracy: &'a dyn Accuracy) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
}

/// Final iterate and trajectory of a run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub w: Vec<f64>,
    pub history: History,
    /// Component gradients charged to the algorithm. Diagnostic full
    /// gradients are not included.
    pub num_grad: usize,
    pub num_epoch: f64,
}

/// Common interface of the stochastic proximal drivers.
pub trait Optimizer {
    /// Short algorithm name used in logs and metric files.
    fn name(&self) -> &'static str;

    /// Minimize `f + lambda * g` from `w0` until the epoch budget is spent.
    fn run<L, G, R>(
        &mut self,
        problem: &CompositeProblem<'_, L, G>,
        w0: Vec<f64>,
        rng: &mut R,
    ) -> Result<RunOutput>
    where
        L: SmoothLoss + ?Sized,
        G: Regularizer + ?Sized,
        R: Rng;
}
