use std::env;

use proxsarah::config::{DataSource, RunConfig};
use proxsarah::data::{load_libsvm, synthetic, Dataset};
use proxsarah::Result;
use rand::Rng;

/// Arguments shared by the binaries. Flags override the config file.
#[derive(Debug, Default)]
pub struct Cli {
    pub config: Option<String>,
    pub algorithm: Option<String>,
    pub data: Option<String>,
    pub log_dir: Option<String>,
    pub experiment: Option<String>,
    pub epochs: Option<f64>,
    pub seed: Option<u64>,
    pub quiet: bool,
}

/// Parses `--flag value` pairs; unknown arguments are ignored with a warning.
pub fn parse_cli<I>(mut args: I) -> Cli
where
    I: Iterator<Item = String>,
{
    let mut cli = Cli::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => cli.config = args.next(),
            "--algorithm" => cli.algorithm = args.next(),
            "--data" => cli.data = args.next(),
            "--log-dir" => cli.log_dir = args.next(),
            "--experiment" => cli.experiment = args.next(),
            "--epochs" => cli.epochs = args.next().and_then(|v| v.parse().ok()),
            "--seed" => cli.seed = args.next().and_then(|v| v.parse().ok()),
            "--quiet" => cli.quiet = true,
            other => log::warn!("ignoring unknown argument {other}"),
        }
    }
    cli
}

pub fn parse_env() -> Cli {
    parse_cli(env::args().skip(1))
}

/// Config file (or defaults) with the command-line overrides applied.
pub fn load_config(cli: &Cli) -> Result<RunConfig> {
    let mut cfg = match &cli.config {
        Some(path) => RunConfig::from_path(path)?,
        None => RunConfig::default(),
    };
    if let Some(path) = &cli.data {
        cfg.data = DataSource::Libsvm {
            path: path.clone(),
            features: None,
        };
    }
    if let Some(e) = cli.epochs {
        cfg.sgd.max_num_epoch = e;
        cfg.sarah.max_num_epoch = e;
    }
    if cli.seed.is_some() {
        cfg.seed = cli.seed;
    }
    if cli.log_dir.is_some() {
        cfg.log_dir = cli.log_dir.clone();
    }
    Ok(cfg)
}

/// Build the `(train, test)` pair described by `cfg`.
pub fn load_data<R: Rng>(cfg: &RunConfig, rng: &mut R) -> Result<(Dataset, Dataset)> {
    let mut data = match &cfg.data {
        DataSource::Synthetic {
            samples,
            features,
            noise,
        } => synthetic::classification(*samples, *features, *noise, rng)?,
        DataSource::Libsvm { path, features } => load_libsvm(path, *features)?,
    };
    if cfg.normalize {
        data.normalize_rows();
    }
    data.split(cfg.test_fraction, rng)
}
