use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use csv::Writer;
use serde::Serialize;

use crate::error::Result;
use crate::optim::{History, Snapshot};

/// Static description of a run, handed to observers before the first
/// checkpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub algorithm: &'static str,
    pub num_samples: usize,
    pub dim: usize,
    pub max_num_epoch: f64,
    /// One-line rendering of the driver configuration.
    pub settings: String,
}

/// Hooks into the snapshot stream of a driver.
///
/// Observers cannot alter the run; the epoch budget alone decides when it
/// stops.
pub trait Callback {
    /// Called once before the first checkpoint.
    fn on_train_begin(&mut self, _info: &RunInfo) {}

    /// Called for every recorded snapshot, in order.
    fn on_snapshot(&mut self, _snapshot: &Snapshot) {}

    /// Called once after the run ends without error.
    fn on_train_end(&mut self, _history: &History) {}
}

/// Row written to `metrics.jsonl` and `metrics.csv`.
///
/// Missing accuracies are written as `NaN` so the CSV keeps a fixed width;
/// JSON renders them as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricRecord {
    pub algorithm: &'static str,
    pub num_grad: usize,
    pub epoch: f64,
    pub train_loss: f64,
    pub grad_norm: f64,
    pub min_grad_norm: f64,
    pub train_acc: f64,
    pub test_acc: f64,
}

impl MetricRecord {
    pub fn new(algorithm: &'static str, s: &Snapshot) -> Self {
        Self {
            algorithm,
            num_grad: s.num_grad,
            epoch: s.epoch,
            train_loss: s.train_loss,
            grad_norm: s.grad_norm,
            min_grad_norm: s.min_grad_norm,
            train_acc: s.train_acc.unwrap_or(f64::NAN),
            test_acc: s.test_acc.unwrap_or(f64::NAN),
        }
    }
}

/// Appends snapshots to `<log_dir>/<experiment>/metrics.{jsonl,csv}`.
pub struct Logger {
    dir: PathBuf,
    json: File,
    csv: Writer<File>,
    algorithm: &'static str,
}

impl Logger {
    /// `log_dir` defaults to `runs`, `experiment` to the current unix time.
    pub fn new(log_dir: Option<String>, experiment: Option<String>) -> Result<Self> {
        let base = log_dir.unwrap_or_else(|| "runs".to_string());
        let exp = experiment.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_else(|_| Duration::from_secs(0))
                .as_secs()
                .to_string()
        });
        let dir = PathBuf::from(base).join(exp);
        std::fs::create_dir_all(&dir)?;
        let json = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("metrics.jsonl"))?;
        let csv_path = dir.join("metrics.csv");
        let fresh = std::fs::metadata(&csv_path).map(|m| m.len() == 0).unwrap_or(true);
        let csv_file = OpenOptions::new().create(true).append(true).open(&csv_path)?;
        let csv = csv::WriterBuilder::new()
            .has_headers(fresh)
            .from_writer(csv_file);
        log::debug!("writing metrics to {}", dir.display());
        Ok(Logger {
            dir,
            json,
            csv,
            algorithm: "unknown",
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log<T: Serialize>(&mut self, metrics: &T) -> Result<()> {
        let line = serde_json::to_string(metrics)?;
        writeln!(self.json, "{line}")?;
        self.csv.serialize(metrics)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.json.flush()?;
        self.csv.flush()?;
        Ok(())
    }
}

impl Callback for Logger {
    fn on_train_begin(&mut self, info: &RunInfo) {
        self.algorithm = info.algorithm;
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        let record = MetricRecord::new(self.algorithm, snapshot);
        if let Err(e) = self.log(&record) {
            log::warn!("failed to write metrics: {e}");
        }
    }

    fn on_train_end(&mut self, _history: &History) {
        if let Err(e) = self.flush() {
            log::warn!("failed to flush metrics: {e}");
        }
    }
}

/// Reads back a `metrics.jsonl` file written by [`Logger`].
pub fn read_metrics(path: &Path) -> Result<Vec<serde_json::Value>> {
    let text = std::fs::read_to_string(path)?;
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(Into::into))
        .collect()
}
