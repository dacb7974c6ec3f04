use proxsarah::config::DataSource;
use proxsarah::math;
use proxsarah::models::{penalty_for, MarginLoss};
use proxsarah::optim::{CompositeProblem, Optimizer, ProxSarah, ProxSgd, RunOutput};
use proxsarah::rng::rng_from_seed;
use proxsarah::util::progress::EpochProgress;
use proxsarah::Result;

mod common;

struct Row {
    name: &'static str,
    out: RunOutput,
    ops: usize,
}

fn main() {
    env_logger::init();
    let cli = common::parse_env();
    if let Err(e) = run(&cli) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: &common::Cli) -> Result<()> {
    let mut cfg = common::load_config(cli)?;
    if cli.config.is_none() && cli.data.is_none() {
        cfg.data = DataSource::Synthetic {
            samples: 2000,
            features: 50,
            noise: 0.2,
        };
    }
    let seed = cfg.seed.unwrap_or(42);
    cfg.seed = Some(seed);

    let mut rng = rng_from_seed(Some(seed));
    let (train, test) = common::load_data(&cfg, &mut rng)?;
    let loss = MarginLoss::new(&train, cfg.loss.into());
    let penalty = penalty_for(cfg.penalty);
    let mut problem = CompositeProblem::new(&loss, penalty.as_ref());
    if !test.is_empty() {
        problem = problem.with_accuracy(&test);
    }
    let w0 = vec![0.0; train.dim()];

    println!("Running ProxSGD for {} epochs...", cfg.sgd.max_num_epoch);
    let mut sgd = ProxSgd::new(cfg.sgd.clone()).with_callback(EpochProgress::new());
    let sgd_row = timed(&mut sgd, &problem, w0.clone(), seed)?;

    println!("Running ProxSARAH for {} epochs...", cfg.sarah.max_num_epoch);
    let mut sarah = ProxSarah::new(cfg.sarah.clone()).with_callback(EpochProgress::new());
    let sarah_row = timed(&mut sarah, &problem, w0, seed)?;

    println!("\nComparison (seed {seed}, n = {}):", train.len());
    for row in [&sgd_row, &sarah_row] {
        print_row(row);
    }
    Ok(())
}

fn timed<O, L, G>(
    opt: &mut O,
    problem: &CompositeProblem<'_, L, G>,
    w0: Vec<f64>,
    seed: u64,
) -> Result<Row>
where
    O: Optimizer,
    L: proxsarah::SmoothLoss + ?Sized,
    G: proxsarah::Regularizer + ?Sized,
{
    math::reset_matrix_ops();
    let mut rng = rng_from_seed(Some(seed.wrapping_add(1)));
    let out = opt.run(problem, w0, &mut rng)?;
    Ok(Row {
        name: opt.name(),
        out,
        ops: math::matrix_ops_count(),
    })
}

fn print_row(row: &Row) {
    match row.out.history.last() {
        Some(s) => println!(
            "{:<20} -> loss {:.6e}, min ||Grad Map||^2 {:.6e}, test acc {}, grads {}, mat-vecs {}",
            row.name,
            s.train_loss,
            s.min_grad_norm,
            s.test_acc
                .map(|a| format!("{a:.4}"))
                .unwrap_or_else(|| "N/A".to_string()),
            row.out.num_grad,
            row.ops
        ),
        None => println!("{:<20} -> no checkpoints recorded", row.name),
    }
}
