//! Mini-batch stochastic proximal gradient with a diminishing step size
//! (Ghadimi, Lan and Zhang, 2016).

use rand::Rng;

use crate::config::ProxSgdConfig;
use crate::error::{OptimError, Result};
use crate::logging::{Callback, RunInfo};
use crate::math;
use crate::rng::sample_batch;
use crate::util::logging::TableLogger;

use super::diagnostics::{ensure_finite, GradCounter, Recorder};
use super::step_size::{DiminishingLr, LearningRateSchedule};
use super::{CompositeProblem, Optimizer, Regularizer, RunOutput, SmoothLoss};

/// ProxSGD driver.
///
/// Every iteration draws a fresh batch, takes the step
/// `w <- prox_{lambda * eta}(w - eta_k * v)` with the diminishing rate
/// `eta_k` for the gradient part and the base rate `eta` for the penalty,
/// and charges `batch_size` gradients.
pub struct ProxSgd {
    config: ProxSgdConfig,
    callbacks: Vec<Box<dyn Callback>>,
}

impl ProxSgd {
    pub fn new(config: ProxSgdConfig) -> Self {
        Self {
            config,
            callbacks: Vec::new(),
        }
    }

    pub fn config(&self) -> &ProxSgdConfig {
        &self.config
    }

    /// Register an observer for the snapshot stream.
    pub fn with_callback<C: Callback + 'static>(mut self, cb: C) -> Self {
        self.callbacks.push(Box::new(cb));
        self
    }

    pub fn add_callback(&mut self, cb: Box<dyn Callback>) {
        self.callbacks.push(cb);
    }
}

impl Optimizer for ProxSgd {
    fn name(&self) -> &'static str {
        "ProxSGD"
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

        let info = RunInfo {
            algorithm: self.name(),
            num_samples: n,
            dim: d,
            max_num_epoch: cfg.max_num_epoch,
            settings: cfg.summary(),
        };
        log::info!("Start {} ({})", info.algorithm, info.settings);

        let mut callbacks = std::mem::take(&mut self.callbacks);
        if cfg.verbose {
            callbacks.push(Box::new(TableLogger::new(cfg.eval_accuracy)));
        }
        let result = run_loop(&cfg, problem, w0, rng, &info, &mut callbacks);
        if cfg.verbose {
            callbacks.pop();
        }
        self.callbacks = callbacks;
        result
    }
}

fn run_loop<L, G, R>(
    cfg: &ProxSgdConfig,
    problem: &CompositeProblem<'_, L, G>,
    mut w: Vec<f64>,
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
    let schedule = DiminishingLr::new(cfg.eta, cfg.eta_prime, n);
    let mut counter = GradCounter::new(n, cfg.max_num_epoch);
    let mut recorder = Recorder::new(cfg.eta_comp, cfg.lambda, cfg.eval_accuracy, callbacks);
    for cb in recorder.callbacks() {
        cb.on_train_begin(info);
    }

    if cfg.log_enabled {
        recorder.record(problem, &w, None, &counter)?;
        counter.mark_checkpoint();
    }

    let mut total_iter = 0usize;
    loop {
        let batch = sample_batch(rng, n, cfg.batch_size, cfg.sampling);
        let v = problem.loss.gradient(&w, &batch);
        counter.charge(cfg.batch_size);

        total_iter += 1;
        let eta_k = schedule.next_lr(total_iter);
        let forward = math::gradient_step(&w, eta_k, &v);
        w = problem.regularizer.prox(&forward, cfg.lambda * cfg.eta);

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

    log::info!(
        "{} finished after {} iterations, {:.4} epochs",
        info.algorithm,
        total_iter,
        counter.epoch()
    );
    Ok(RunOutput {
        w,
        history: recorder.finish(),
        num_grad: counter.num_grad(),
        num_epoch: counter.epoch(),
    })
}
