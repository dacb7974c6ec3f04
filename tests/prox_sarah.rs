use std::cell::RefCell;
use std::rc::Rc;

use proxsarah::data::synthetic;
use proxsarah::math::{self, Matrix};
use proxsarah::models::{L1Norm, MarginKind, MarginLoss, NoPenalty, QuadraticLoss};
use proxsarah::optim::FullGradient;
use proxsarah::rng::rng_from_seed;
use proxsarah::{
    Callback, CompositeProblem, History, OptimError, Optimizer, ProxSarah, ProxSarahConfig,
    Regularizer, RunInfo, SmoothLoss, Snapshot,
};

fn quadratic(n: usize, d: usize, seed: u64) -> QuadraticLoss {
    QuadraticLoss::new(synthetic::centers(n, d, &mut rng_from_seed(Some(seed))))
}

fn config(inner: usize, max_inner: usize, epochs: f64) -> ProxSarahConfig {
    ProxSarahConfig {
        inner_batch_size: inner,
        max_inner,
        max_num_epoch: epochs,
        ..Default::default()
    }
}

#[test]
fn gradient_count_follows_outer_plus_inner_cost() {
    // outer costs n = 20, each inner step 2 * 2
    let loss = quadratic(20, 3, 1);
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let out = ProxSarah::new(config(2, 5, 3.0))
        .run(&problem, vec![0.0; 3], &mut rng_from_seed(Some(2)))
        .unwrap();
    // outer at 0, inner checkpoint at 20 + 4, outer at 20 + 5 * 4, inner at 40 + 20 + 4
    assert_eq!(out.history.num_grad(), vec![0, 24, 40, 64]);
    assert_eq!(out.num_grad, 64);
    assert!((out.num_epoch - 3.2).abs() < 1e-12);
}

#[test]
fn subsampled_outer_charges_only_its_batch() {
    let loss = quadratic(20, 3, 1);
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let cfg = ProxSarahConfig {
        grad_batch_size: Some(5),
        ..config(2, 5, 1.0)
    };
    let out = ProxSarah::new(cfg)
        .run(&problem, vec![0.0; 3], &mut rng_from_seed(Some(2)))
        .unwrap();
    // 5 + 4 inner steps of 4; the diagnostic full gradient is free
    assert_eq!(out.history.num_grad(), vec![0, 21]);
    assert_eq!(out.num_grad, 21);
}

#[test]
fn budget_stops_run_without_diagnostics() {
    let loss = quadratic(20, 3, 1);
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let cfg = ProxSarahConfig {
        log_enabled: false,
        ..config(2, 5, 3.0)
    };
    let out = ProxSarah::new(cfg)
        .run(&problem, vec![0.0; 3], &mut rng_from_seed(Some(2)))
        .unwrap();
    assert!(out.history.is_empty());
    assert_eq!(out.num_grad, 64);
}

#[test]
fn converges_on_quadratic() {
    // the estimator is exact for a quadratic, so every step contracts by
    // |1 - eta * gamma_t|; over gamma_0..gamma_20 that is about 1e-6 in the
    // squared norm
    let loss = quadratic(50, 4, 3);
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let out = ProxSarah::new(config(5, 20, 5.0))
        .run(&problem, vec![5.0; 4], &mut rng_from_seed(Some(4)))
        .unwrap();
    let g = out.history.grad_norm();
    assert_eq!(out.num_grad, 250);
    assert_eq!(out.history.num_grad(), vec![0, 60, 110, 160, 210, 250]);
    assert!(g[g.len() - 1] < 1e-5 * g[0], "{g:?}");
    let losses = out.history.train_loss();
    assert!(losses.windows(2).all(|p| p[1] <= p[0]));
}

#[test]
fn same_seed_gives_identical_runs() {
    let data = synthetic::classification(200, 8, 0.2, &mut rng_from_seed(Some(10))).unwrap();
    let loss = MarginLoss::new(&data, MarginKind::Tanh);
    let problem = CompositeProblem::new(&loss, &L1Norm).with_accuracy(&data);
    let cfg = ProxSarahConfig {
        lambda: 1e-3,
        grad_batch_size: Some(32),
        eval_accuracy: true,
        ..config(4, 25, 4.0)
    };
    let a = ProxSarah::new(cfg.clone())
        .run(&problem, vec![0.0; 8], &mut rng_from_seed(Some(7)))
        .unwrap();
    let b = ProxSarah::new(cfg)
        .run(&problem, vec![0.0; 8], &mut rng_from_seed(Some(7)))
        .unwrap();
    assert_eq!(a.w, b.w);
    assert_eq!(a.history, b.history);
    assert_eq!(a.history.test_acc().len(), a.history.len());
    assert!(a.history.records().iter().all(|s| s.min_grad_norm <= s.grad_norm));
}

#[test]
fn full_inner_batch_is_rejected() {
    let loss = quadratic(10, 2, 1);
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let res = ProxSarah::new(config(10, 5, 1.0)).run(&problem, vec![0.0; 2], &mut rng_from_seed(Some(0)));
    assert!(matches!(res, Err(OptimError::InvalidConfiguration(_))));
}

struct BrokenDifference(QuadraticLoss);

impl SmoothLoss for BrokenDifference {
    fn num_samples(&self) -> usize {
        self.0.num_samples()
    }

    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn gradient(&self, w: &[f64], batch: &[usize]) -> Vec<f64> {
        self.0.gradient(w, batch)
    }

    fn gradient_difference(&self, _w_prev: &[f64], w: &[f64], _batch: &[usize]) -> Vec<f64> {
        vec![f64::NAN; w.len()]
    }

    fn full_gradient(&self, w: &[f64]) -> FullGradient {
        self.0.full_gradient(w)
    }

    fn loss(&self, w: &[f64], predictions: &[f64]) -> f64 {
        self.0.loss(w, predictions)
    }

    fn lipschitz(&self) -> Option<f64> {
        Some(1.0)
    }
}

#[test]
fn nan_estimator_aborts_with_last_snapshot() {
    let loss = BrokenDifference(QuadraticLoss::new(Matrix::zeros(10, 2)));
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    match ProxSarah::new(config(2, 5, 2.0)).run(&problem, vec![1.0, 1.0], &mut rng_from_seed(Some(0))) {
        Err(OptimError::NumericDivergence { last, epoch, .. }) => {
            assert!((epoch - 1.4).abs() < 1e-12);
            assert_eq!(last.map(|s| s.num_grad), Some(0));
        }
        other => panic!("expected divergence, got {other:?}"),
    }
}

#[derive(Default)]
struct Seen {
    algorithm: Option<&'static str>,
    snapshots: usize,
    ended_with: Option<usize>,
}

struct Recording(Rc<RefCell<Seen>>);

impl Callback for Recording {
    fn on_train_begin(&mut self, info: &RunInfo) {
        self.0.borrow_mut().algorithm = Some(info.algorithm);
    }

    fn on_snapshot(&mut self, _snapshot: &Snapshot) {
        self.0.borrow_mut().snapshots += 1;
    }

    fn on_train_end(&mut self, history: &History) {
        self.0.borrow_mut().ended_with = Some(history.len());
    }
}

#[test]
fn observers_see_every_snapshot() {
    let seen = Rc::new(RefCell::new(Seen::default()));
    let loss = quadratic(20, 3, 1);
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let mut opt = ProxSarah::new(config(2, 5, 3.0)).with_callback(Recording(seen.clone()));
    let out = opt
        .run(&problem, vec![0.0; 3], &mut rng_from_seed(Some(2)))
        .unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.algorithm, Some("ProxSARAH-Adaptive"));
    assert_eq!(seen.snapshots, out.history.len());
    assert_eq!(seen.ended_with, Some(out.history.len()));
}

#[test]
fn one_outer_iteration_matches_hand_replay() {
    // outer 10 + two inner steps of 4 reach the 1.5 epoch budget exactly once
    let loss = quadratic(10, 3, 5);
    let problem = CompositeProblem::new(&loss, &L1Norm);
    let cfg = ProxSarahConfig {
        lambda: 0.1,
        ..config(2, 2, 1.5)
    };
    let mut opt = ProxSarah::new(cfg.clone());
    let gammas = opt.step_sizes(&loss).unwrap();
    let w0 = vec![1.0, -0.5, 0.25];
    let out = opt.run(&problem, w0.clone(), &mut rng_from_seed(Some(6))).unwrap();

    let step = cfg.eta;
    let thresh = cfg.lambda * cfg.eta;
    let mut v = loss.full_gradient(&w0).gradient;
    let w_hat = L1Norm.prox(&math::gradient_step(&w0, step, &v), thresh);
    let mut w = math::lerp(&w0, &w_hat, gammas.get(0));
    let mut w_prev = w0;
    for t in 0..2 {
        let diff = loss.gradient_difference(&w_prev, &w, &[]);
        math::axpy(1.0, &diff, &mut v);
        let w_hat = L1Norm.prox(&math::gradient_step(&w, step, &v), thresh);
        let w_next = math::lerp(&w, &w_hat, gammas.get(t + 1));
        w_prev = std::mem::replace(&mut w, w_next);
    }

    assert_eq!(out.num_grad, 18);
    assert_ne!(gammas.get(0), gammas.get(1));
    for (a, b) in out.w.iter().zip(&w) {
        assert!((a - b).abs() < 1e-14, "{:?} vs {w:?}", out.w);
    }
}
