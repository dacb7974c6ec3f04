use proxsarah::data::synthetic;
use proxsarah::math::{self, Matrix};
use proxsarah::metrics::prefix_min;
use proxsarah::models::{L1Norm, MarginKind, MarginLoss, NoPenalty, NonNegative, QuadraticLoss};
use proxsarah::rng::rng_from_seed;
use proxsarah::{CompositeProblem, OptimError, Optimizer, ProxSgd, ProxSgdConfig, Regularizer};

fn full_batch(n: usize, eta: f64, eta_prime: f64, epochs: f64) -> ProxSgdConfig {
    ProxSgdConfig {
        eta,
        eta_prime,
        batch_size: n,
        max_num_epoch: epochs,
        ..Default::default()
    }
}

#[test]
fn full_batch_follows_closed_form_recursion() {
    // f = 0.5 ||w||^2, g = 0: w_{k+1} = (1 - eta_k) w_k
    let loss = QuadraticLoss::new(Matrix::zeros(4, 2));
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let mut opt = ProxSgd::new(full_batch(4, 0.25, 1.0, 5.0));
    let mut rng = rng_from_seed(Some(0));
    let out = opt.run(&problem, vec![1.0, -2.0], &mut rng).unwrap();

    // eta_k = 0.25 for k = 1..3, then 0.125 once k / n reaches 1
    let rates = [0.25, 0.25, 0.25, 0.125, 0.125];
    let mut w = [1.0, -2.0];
    let mut expected_norm = vec![5.0];
    for r in rates {
        w.iter_mut().for_each(|x| *x *= 1.0 - r);
        expected_norm.push(w[0] * w[0] + w[1] * w[1]);
    }

    assert_eq!(out.num_grad, 20);
    assert_eq!(out.num_epoch, 5.0);
    assert_eq!(out.history.len(), 6);
    for (a, b) in out.w.iter().zip(&w) {
        assert!((a - b).abs() < 1e-14);
    }
    for (a, b) in out.history.grad_norm().iter().zip(&expected_norm) {
        assert!((a - b).abs() < 1e-13, "{a} vs {b}");
    }
}

#[test]
fn one_epoch_moves_toward_mean_center() {
    let mut rng = rng_from_seed(Some(5));
    let centers = proxsarah::data::synthetic::centers(100, 2, &mut rng);
    let mean = [
        (0..100).map(|i| centers.get(i, 0)).sum::<f64>() / 100.0,
        (0..100).map(|i| centers.get(i, 1)).sum::<f64>() / 100.0,
    ];
    let loss = QuadraticLoss::new(centers);
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let mut opt = ProxSgd::new(full_batch(100, 0.1, 0.0, 1.0));
    let w0 = vec![3.0, -3.0];
    let out = opt.run(&problem, w0.clone(), &mut rng).unwrap();

    let dist = |w: &[f64]| (w[0] - mean[0]).powi(2) + (w[1] - mean[1]).powi(2);
    assert!(dist(&out.w) < dist(&w0));
    assert!((dist(&out.w) - 0.81 * dist(&w0)).abs() < 1e-10);

    let losses = out.history.train_loss();
    assert_eq!(losses.len(), 2);
    assert!(losses.windows(2).all(|p| p[1] < p[0]));
}

#[test]
fn checkpoints_once_per_epoch_with_running_minimum() {
    let mut rng = rng_from_seed(Some(9));
    let centers = proxsarah::data::synthetic::centers(50, 3, &mut rng);
    let loss = QuadraticLoss::new(centers);
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let cfg = ProxSgdConfig {
        eta: 0.5,
        batch_size: 7,
        max_num_epoch: 6.0,
        ..Default::default()
    };
    let out = ProxSgd::new(cfg)
        .run(&problem, vec![2.0; 3], &mut rng)
        .unwrap();

    let h = &out.history;
    // 7 does not divide 50: regular checkpoints land every 8 steps, the last
    // one is forced by the budget
    assert_eq!(h.num_grad(), vec![0, 56, 112, 168, 224, 280, 301]);
    assert_eq!(out.num_grad, 301);
    assert!((out.num_epoch - 6.02).abs() < 1e-12);
    assert_eq!(h.min_grad_norm(), prefix_min(&h.grad_norm()));
}

#[test]
fn budget_stops_run_without_diagnostics() {
    let loss = QuadraticLoss::new(Matrix::zeros(10, 2));
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let cfg = ProxSgdConfig {
        batch_size: 3,
        max_num_epoch: 2.0,
        log_enabled: false,
        ..Default::default()
    };
    let out = ProxSgd::new(cfg)
        .run(&problem, vec![1.0, 1.0], &mut rng_from_seed(Some(1)))
        .unwrap();
    assert!(out.history.is_empty());
    assert_eq!(out.num_grad, 21);
}

#[test]
fn projection_keeps_iterates_feasible() {
    let c = Matrix::from_rows(&[vec![-1.0, 2.0], vec![-3.0, 1.0], vec![0.5, -1.0]]);
    let loss = QuadraticLoss::new(c);
    let problem = CompositeProblem::new(&loss, &NonNegative);
    let cfg = ProxSgdConfig {
        batch_size: 1,
        max_num_epoch: 20.0,
        eta: 0.3,
        ..Default::default()
    };
    let out = ProxSgd::new(cfg)
        .run(&problem, vec![0.0, 0.0], &mut rng_from_seed(Some(2)))
        .unwrap();
    assert!(out.w.iter().all(|x| *x >= 0.0));
    assert!(out.history.train_loss().iter().all(|l| l.is_finite()));
}

#[test]
fn invalid_configuration_is_rejected_before_running() {
    let loss = QuadraticLoss::new(Matrix::zeros(5, 2));
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let mut rng = rng_from_seed(Some(0));

    let mut opt = ProxSgd::new(full_batch(6, 0.1, 0.0, 1.0));
    assert!(matches!(
        opt.run(&problem, vec![0.0; 2], &mut rng),
        Err(OptimError::InvalidConfiguration(_))
    ));

    let mut opt = ProxSgd::new(full_batch(5, 0.1, 0.0, 1.0));
    assert!(matches!(
        opt.run(&problem, vec![0.0; 3], &mut rng),
        Err(OptimError::InvalidConfiguration(_))
    ));

    let mut opt = ProxSgd::new(full_batch(5, 0.1, 0.0, 0.0));
    assert!(opt.run(&problem, vec![0.0; 2], &mut rng).is_err());
}

#[test]
fn blow_up_reports_last_good_snapshot() {
    let loss = QuadraticLoss::new(Matrix::zeros(2, 2));
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let mut opt = ProxSgd::new(full_batch(2, 1e200, 0.0, 10.0));
    match opt.run(&problem, vec![1.0, 1.0], &mut rng_from_seed(Some(0))) {
        Err(OptimError::NumericDivergence { last, .. }) => {
            let last = last.expect("initial snapshot recorded");
            assert_eq!(last.epoch, 0.0);
            assert_eq!(last.grad_norm, 2.0);
        }
        other => panic!("expected divergence, got {other:?}"),
    }
}

#[test]
fn prox_threshold_uses_base_rate() {
    // gradient step with eta_k, soft threshold with lambda * eta_0 throughout
    let loss = QuadraticLoss::new(Matrix::zeros(2, 2));
    let problem = CompositeProblem::new(&loss, &L1Norm);
    let cfg = ProxSgdConfig {
        lambda: 0.1,
        ..full_batch(2, 0.5, 1.0, 4.0)
    };
    let out = ProxSgd::new(cfg)
        .run(&problem, vec![2.0, -1.0], &mut rng_from_seed(Some(0)))
        .unwrap();

    let rates = [0.5, 0.25, 0.25, 0.5 / 3.0];
    let mut w = vec![2.0, -1.0];
    for r in rates {
        let forward = math::gradient_step(&w, r, &w);
        w = L1Norm.prox(&forward, 0.1 * 0.5);
    }

    assert_eq!(out.num_grad, 8);
    assert!(w.iter().all(|x| *x != 0.0));
    for (a, b) in out.w.iter().zip(&w) {
        assert!((a - b).abs() < 1e-14, "{:?} vs {w:?}", out.w);
    }
}

#[test]
fn train_accuracy_is_recorded_without_test_set() {
    let data = synthetic::classification(60, 4, 0.1, &mut rng_from_seed(Some(3))).unwrap();
    let loss = MarginLoss::new(&data, MarginKind::Logistic);
    let problem = CompositeProblem::new(&loss, &NoPenalty);
    let cfg = ProxSgdConfig {
        batch_size: 10,
        max_num_epoch: 2.0,
        eval_accuracy: true,
        ..Default::default()
    };
    let out = ProxSgd::new(cfg)
        .run(&problem, vec![0.0; 4], &mut rng_from_seed(Some(4)))
        .unwrap();

    assert!(!out.history.is_empty());
    for s in out.history.records() {
        let acc = s.train_acc.unwrap();
        assert!((0.0..=1.0).contains(&acc));
        assert!(s.test_acc.is_none());
    }
}
