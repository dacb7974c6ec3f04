//! ProxSARAH with the adaptive step-size sequence (Pham, Nguyen, Phan and
//! Tran-Dinh, 2019).
//!
//! Each outer iteration starts from a (mini-)batch gradient at the reference
//! point `w_til`; the inner loop then corrects the estimator with gradient
//! differences on shared samples,
//!
//! ```text
//! v     <- v + grad f_S(w) - grad f_S(w_prev)
//! w_hat  = prox_{lambda * eta}(w - eta * v)
//! w     <- (1 - gamma_t) w + gamma_t w_hat
//! ```
//!
//! and never recomputes `v` from scratch until the next outer iteration.

use rand::Rng;

use crate::config::ProxSarahConfig;
use crate::error::{OptimError, Result};
use crate::logging::{Callback, RunInfo};
use crate::math;
use crate::rng::sample_batch;
use crate::util::logging::TableLogger;

use super::diagnostics::{ensure_finite, GradCounter, Recorder};
use super::step_size::AdaptiveStepSizes;
use super::{CompositeProblem, Optimizer, Regularizer, RunOutput, SmoothLoss};

pub struct ProxSarah {
    config: ProxSarahConfig,
    callbacks: Vec<Box<dyn Callback>>,
}

impl ProxSarah {
    pub fn new(config: ProxSarahConfig) -> Self {
        Self {
            config,
            callbacks: Vec::new(),
        }
    }

    pub fn config(&self) -> &ProxSarahConfig {
        &self.config
    }

    pub fn with_callback<C: Callback + 'static>(mut self, cb: C) -> Self {
        self.callbacks.push(Box::new(cb));
        self
    }

    pub fn add_callback(&mut self, cb: Box<dyn Callback>) {
        self.callbacks.push(cb);
    }

    /// Step sizes this configuration yields on `loss`, resolving the
    /// Lipschitz constant the same way [`Optimizer::run`] does.
    pub fn step_sizes<L: SmoothLoss + ?Sized>(&self, loss: &L) -> Result<AdaptiveStepSizes> {
        let n = loss.num_samples();
        let lipschitz = self
            .config
            .lipschitz
            .or_else(|| loss.lipschitz())
            .ok_or_else(|| {
                OptimError::invalid("no Lipschitz constant configured and the loss provides none")
            })?;
        AdaptiveStepSizes::new(
            self.config.max_inner,
            self.config.gamma_m,
            lipschitz,
            self.config.eta,
            n,
            self.config.inner_batch_size,
        )
    }
}

impl Optimizer for ProxSarah {
    fn name(&self) -> &'static str {
        "ProxSARAH-Adaptive"
    }

    fn run<L, G, R>(
        &mut self,
        problem: &CompositeProblem<'_, L, G>,
        w0: Vec<f64>,
        rng: &mut R,
    ) -> Result<RunOutput>
    where
        L: SmoothLoss + ?Sized,
        G: Regularizer + ?Sized,
        R: Rng,
    {
        let n = problem.loss.num_samples();
        let d = problem.loss.dim();
        let cfg = self.config.clone();
        cfg.validate(n)?;
        if w0.len() != d {
            return Err(OptimError::invalid(format!(
                "initial point has dimension {}, expected {d}",
                w0.len()
            )));
        }
        let gammas = self.step_sizes(problem.loss)?;

        let info = RunInfo {
            algorithm: self.name(),
            num_samples: n,
            dim: d,
            max_num_epoch: cfg.max_num_epoch,
            settings: cfg.summary(),
        };
        log::info!("Start {} ({})", info.algorithm, info.settings);
        log::debug!(
            "gamma_0 = {:.6e}, gamma_m = {:.6e}",
            gammas.get(0),
            gammas.get(cfg.max_inner)
        );

        let mut callbacks = std::mem::take(&mut self.callbacks);
        if cfg.verbose {
            callbacks.push(Box::new(TableLogger::new(cfg.eval_accuracy)));
        }
        let result = run_loop(&cfg, &gammas, problem, w0, rng, &info, &mut callbacks);
        if cfg.verbose {
            callbacks.pop();
        }
        self.callbacks = callbacks;
        result
    }
}

fn run_loop<L, G, R>(
    cfg: &ProxSarahConfig,
    gammas: &AdaptiveStepSizes,
    problem: &CompositeProblem<'_, L, G>,
    w0: Vec<f64>,
    rng: &mut R,
    info: &RunInfo,
    callbacks: &mut [Box<dyn Callback>],
) -> Result<RunOutput>
where
    L: SmoothLoss + ?Sized,
    G: Regularizer + ?Sized,
    R: Rng,
{
    let n = info.num_samples;
    let outer_batch = cfg.outer_batch(n);
    let prox_step = cfg.lambda * cfg.eta;
    let mut counter = GradCounter::new(n, cfg.max_num_epoch);
    let mut recorder = Recorder::new(cfg.eta_comp, cfg.lambda, cfg.eval_accuracy, callbacks);
    for cb in recorder.callbacks() {
        cb.on_train_begin(info);
    }

    let mut w_til = w0;
    let mut w = w_til.clone();
    let mut outer_iter = 0usize;

    while !counter.budget_reached() {
        outer_iter += 1;

        // Outer estimator. With a subsampled estimator the diagnostic needs
        // its own full gradient at w_til.
        let (mut v, full) = if outer_batch < n {
            let batch = sample_batch(rng, n, outer_batch, cfg.sampling);
            let v = problem.loss.gradient(&w_til, &batch);
            let full = cfg.log_enabled.then(|| problem.loss.full_gradient(&w_til));
            (v, full)
        } else {
            let full = problem.loss.full_gradient(&w_til);
            (full.gradient.clone(), Some(full))
        };

        if cfg.log_enabled {
            ensure_finite(&w_til, &v, counter.epoch(), recorder.history())?;
            recorder.record(problem, &w_til, full, &counter)?;
            counter.mark_checkpoint();
        }

        counter.charge(outer_batch);

        let w_hat = problem
            .regularizer
            .prox(&math::gradient_step(&w_til, cfg.eta, &v), prox_step);
        let mut w_prev = std::mem::take(&mut w_til);
        w = math::lerp(&w_prev, &w_hat, gammas.get(0));

        for t in 0..cfg.max_inner {
            let batch = sample_batch(rng, n, cfg.inner_batch_size, cfg.sampling);
            let diff = problem.loss.gradient_difference(&w_prev, &w, &batch);
            counter.charge(2 * cfg.inner_batch_size);

            math::axpy(1.0, &diff, &mut v);
            let w_hat = problem
                .regularizer
                .prox(&math::gradient_step(&w, cfg.eta, &v), prox_step);
            let w_next = math::lerp(&w, &w_hat, gammas.get(t + 1));
            w_prev = std::mem::replace(&mut w, w_next);

            if counter.checkpoint_due() {
                ensure_finite(&w, &v, counter.epoch(), recorder.history())?;
                if cfg.log_enabled {
                    recorder.record(problem, &w, None, &counter)?;
                }
                counter.mark_checkpoint();
                if counter.budget_reached() {
                    break;
                }
            }
        }

        w_til = w.clone();
    }

    log::info!(
        "{} finished after {} outer iterations, {:.4} epochs",
        info.algorithm,
        outer_iter,
        counter.epoch()
    );
    Ok(RunOutput {
        w,
        history: recorder.finish(),
        num_grad: counter.num_grad(),
        num_epoch: counter.epoch(),
    })
}
