//! Gradient-mapping diagnostic and the bookkeeping shared by both drivers.

use crate::error::{OptimError, Result};
use crate::logging::Callback;
use crate::math;
use crate::metrics::margin_accuracy;

use super::history::{History, Snapshot};
use super::{CompositeProblem, FullGradient, Regularizer, SmoothLoss};

/// Squared norm of the gradient mapping
///
/// ```text
/// G(w) = (w - prox_{eta_c * lambda * g}(w - eta_c * grad f(w))) / eta_c
/// ```
///
/// It equals `||grad f(w)||^2` when `g = 0` and vanishes exactly at
/// stationary points of `f + lambda * g`. `eta_comp` must be positive.
pub fn gradient_mapping_norm_sq<G: Regularizer + ?Sized>(
    w: &[f64],
    full_grad: &[f64],
    eta_comp: f64,
    lambda: f64,
    regularizer: &G,
) -> f64 {
    let forward = math::gradient_step(w, eta_comp, full_grad);
    let prox = regularizer.prox(&forward, lambda * eta_comp);
    w.iter()
        .zip(&prox)
        .map(|(&wi, &pi)| {
            let gi = (wi - pi) / eta_comp;
            gi * gi
        })
        .sum()
}

/// Gradient-evaluation counter and checkpoint cadence.
///
/// A checkpoint is due once `n` component gradients have been charged since
/// the last one, or when the epoch budget is reached.
#[derive(Debug, Clone)]
pub(crate) struct GradCounter {
    n: usize,
    num_grad: usize,
    last_checkpoint: usize,
    max_num_epoch: f64,
}

impl GradCounter {
    pub(crate) fn new(n: usize, max_num_epoch: f64) -> Self {
        Self {
            n,
            num_grad: 0,
            last_checkpoint: 0,
            max_num_epoch,
        }
    }

    pub(crate) fn charge(&mut self, evals: usize) {
        self.num_grad += evals;
    }

    pub(crate) fn num_grad(&self) -> usize {
        self.num_grad
    }

    pub(crate) fn epoch(&self) -> f64 {
        self.num_grad as f64 / self.n as f64
    }

    pub(crate) fn budget_reached(&self) -> bool {
        self.epoch() >= self.max_num_epoch
    }

    pub(crate) fn checkpoint_due(&self) -> bool {
        self.num_grad - self.last_checkpoint >= self.n || self.budget_reached()
    }

    pub(crate) fn mark_checkpoint(&mut self) {
        self.last_checkpoint = self.num_grad;
    }
}

/// Fail with [`OptimError::NumericDivergence`] if the iterate or the
/// estimator holds a NaN or infinity.
pub(crate) fn ensure_finite(w: &[f64], v: &[f64], epoch: f64, history: &History) -> Result<()> {
    let what = if !math::all_finite(w) {
        "iterate"
    } else if !math::all_finite(v) {
        "gradient estimator"
    } else {
        return Ok(());
    };
    log::warn!("non-finite {what} at epoch {epoch:.4}, aborting run");
    Err(divergence(epoch, what, history))
}

fn divergence(epoch: f64, what: &'static str, history: &History) -> OptimError {
    OptimError::NumericDivergence {
        epoch,
        what,
        last: history.last().cloned().map(Box::new),
    }
}

/// Turns checkpoints into snapshots, keeps the running minimum and feeds
/// the observers.
pub(crate) struct Recorder<'c> {
    eta_comp: f64,
    lambda: f64,
    eval_accuracy: bool,
    min_grad_norm: f64,
    history: History,
    callbacks: &'c mut [Box<dyn Callback>],
}

impl<'c> Recorder<'c> {
    pub(crate) fn new(
        eta_comp: f64,
        lambda: f64,
        eval_accuracy: bool,
        callbacks: &'c mut [Box<dyn Callback>],
    ) -> Self {
        Self {
            eta_comp,
            lambda,
            eval_accuracy,
            min_grad_norm: f64::INFINITY,
            history: History::new(),
            callbacks,
        }
    }

    pub(crate) fn callbacks(&mut self) -> &mut [Box<dyn Callback>] {
        &mut *self.callbacks
    }

    pub(crate) fn history(&self) -> &History {
        &self.history
    }

    /// Record a checkpoint at `w`. `full` is reused when the caller already
    /// holds the full gradient at `w`; otherwise it is computed here.
    pub(crate) fn record<L, G>(
        &mut self,
        problem: &CompositeProblem<'_, L, G>,
        w: &[f64],
        full: Option<FullGradient>,
        counter: &GradCounter,
    ) -> Result<()>
    where
        L: SmoothLoss + ?Sized,
        G: Regularizer + ?Sized,
    {
        let full = match full {
            Some(f) => f,
            None => problem.loss.full_gradient(w),
        };
        let grad_norm = gradient_mapping_norm_sq(
            w,
            &full.gradient,
            self.eta_comp,
            self.lambda,
            problem.regularizer,
        );
        let train_loss =
            problem.loss.loss(w, &full.predictions) + self.lambda * problem.regularizer.value(w);
        let epoch = counter.epoch();

        if !grad_norm.is_finite() {
            return Err(divergence(epoch, "gradient mapping", &self.history));
        }
        if !train_loss.is_finite() {
            return Err(divergence(epoch, "training loss", &self.history));
        }

        let (train_acc, test_acc) = if self.eval_accuracy {
            (
                Some(margin_accuracy(&full.predictions)),
                problem.accuracy.map(|acc| acc.accuracy(w)),
            )
        } else {
            (None, None)
        };

        self.min_grad_norm = self.min_grad_norm.min(grad_norm);
        let snapshot = Snapshot {
            num_grad: counter.num_grad(),
            epoch,
            train_loss,
            grad_norm,
            min_grad_norm: self.min_grad_norm,
            train_acc,
            test_acc,
        };
        log::debug!(
            "epoch {:.4} loss {:.6e} grad map {:.6e}",
            snapshot.epoch,
            snapshot.train_loss,
            snapshot.grad_norm
        );
        for cb in self.callbacks.iter_mut() {
            cb.on_snapshot(&snapshot);
        }
        self.history.push(snapshot);
        Ok(())
    }

    pub(crate) fn finish(self) -> History {
        for cb in self.callbacks.iter_mut() {
            cb.on_train_end(&self.history);
        }
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Zero;

    impl Regularizer for Zero {
        fn prox(&self, x: &[f64], _step: f64) -> Vec<f64> {
            x.to_vec()
        }

        fn value(&self, _w: &[f64]) -> f64 {
            0.0
        }
    }

    #[test]
    fn reduces_to_gradient_norm_without_penalty() {
        let g = [3.0, -4.0];
        let v = gradient_mapping_norm_sq(&[1.0, 1.0], &g, 0.25, 0.0, &Zero);
        assert!((v - 25.0).abs() < 1e-12);
    }

    #[test]
    fn counter_checkpoints_every_n() {
        let mut c = GradCounter::new(10, 3.0);
        c.charge(4);
        assert!(!c.checkpoint_due());
        c.charge(6);
        assert!(c.checkpoint_due());
        c.mark_checkpoint();
        assert!(!c.checkpoint_due());
        c.charge(20);
        assert!(c.budget_reached());
        assert!(c.checkpoint_due());
        assert_eq!(c.epoch(), 3.0);
    }

    #[test]
    fn finite_check_names_the_offender() {
        let h = History::new();
        assert!(ensure_finite(&[1.0], &[2.0], 0.0, &h).is_ok());
        match ensure_finite(&[1.0], &[f64::NAN], 0.5, &h) {
            Err(OptimError::NumericDivergence { what, last, .. }) => {
                assert_eq!(what, "gradient estimator");
                assert!(last.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
