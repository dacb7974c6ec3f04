use std::process::ExitCode;

use proxsarah::data::Dataset;
use proxsarah::logging::Logger;
use proxsarah::math;
use proxsarah::models::{penalty_for, MarginLoss};
use proxsarah::optim::{CompositeProblem, Optimizer, ProxSarah, ProxSgd, RunOutput};
use proxsarah::rng::rng_from_seed;
use proxsarah::util::logging::{format_summary, log_total_ops};
use proxsarah::util::progress::EpochProgress;
use proxsarah::{OptimError, Result, RunConfig};

mod common;

fn main() -> ExitCode {
    env_logger::init();
    let cli = common::parse_env();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            if let OptimError::NumericDivergence { last: Some(s), .. } = &e {
                log::error!(
                    "last good checkpoint: epoch {:.4}, loss {:.6e}",
                    s.epoch,
                    s.train_loss
                );
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &common::Cli) -> Result<()> {
    let cfg = common::load_config(cli)?;
    let mut rng = rng_from_seed(cfg.seed);
    let (train, test) = common::load_data(&cfg, &mut rng)?;
    log::info!(
        "train on {} samples, {} held out, d = {}",
        train.len(),
        test.len(),
        train.dim()
    );

    let algorithm = cli.algorithm.as_deref().unwrap_or("sarah");
    let logger = Logger::new(cfg.log_dir.clone(), cli.experiment.clone())?;
    log::info!("metrics go to {}", logger.dir().display());

    math::reset_matrix_ops();
    let out = match algorithm {
        "sgd" => {
            let mut opt = ProxSgd::new(cfg.sgd.clone()).with_callback(logger);
            if !cli.quiet {
                opt.add_callback(Box::new(EpochProgress::new()));
            }
            solve(&mut opt, &cfg, &train, &test, &mut rng)?
        }
        "sarah" => {
            let mut opt = ProxSarah::new(cfg.sarah.clone()).with_callback(logger);
            if !cli.quiet {
                opt.add_callback(Box::new(EpochProgress::new()));
            }
            solve(&mut opt, &cfg, &train, &test, &mut rng)?
        }
        other => {
            return Err(OptimError::InvalidConfiguration(format!(
                "unknown algorithm `{other}`, expected sgd or sarah"
            )))
        }
    };

    println!("{}", format_summary(algorithm, &out.history));
    println!(
        "gradients charged: {} ({:.3} epochs)",
        out.num_grad, out.num_epoch
    );
    let nnz = out.w.iter().filter(|x| **x != 0.0).count();
    println!("nonzeros in w: {nnz}/{}", out.w.len());
    log_total_ops(math::matrix_ops_count());
    Ok(())
}

fn solve<O: Optimizer, R: rand::Rng>(
    opt: &mut O,
    cfg: &RunConfig,
    train: &Dataset,
    test: &Dataset,
    rng: &mut R,
) -> Result<RunOutput> {
    let loss = MarginLoss::new(train, cfg.loss.into());
    let penalty = penalty_for(cfg.penalty);
    let mut problem = CompositeProblem::new(&loss, penalty.as_ref());
    if !test.is_empty() {
        problem = problem.with_accuracy(test);
    }
    opt.run(&problem, vec![0.0; train.dim()], rng)
}
