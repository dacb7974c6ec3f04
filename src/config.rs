use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{OptimError, Result};

/// How mini-batch indices are drawn from `0..n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    #[default]
    WithoutReplacement,
    WithReplacement,
}

/// Hyperparameters of the ProxSGD driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxSgdConfig {
    /// Base learning rate η₀. Also scales the penalty inside the prox.
    pub eta: f64,
    /// Decay factor η' of the diminishing schedule.
    pub eta_prime: f64,
    /// Step used only by the gradient-mapping diagnostic.
    pub eta_comp: f64,
    /// Penalty weight λ.
    pub lambda: f64,
    pub batch_size: usize,
    /// Epoch budget; the run stops at the first checkpoint at or past it.
    pub max_num_epoch: f64,
    pub sampling: Sampling,
    /// Compute diagnostics and record history.
    pub log_enabled: bool,
    /// Record train accuracy, and test accuracy when an accuracy collaborator
    /// is given.
    pub eval_accuracy: bool,
    /// Attach a console table observer.
    pub verbose: bool,
}

impl Default for ProxSgdConfig {
    fn default() -> Self {
        Self {
            eta: 0.1,
            eta_prime: 1.0,
            eta_comp: 0.5,
            lambda: 0.0,
            batch_size: 10,
            max_num_epoch: 10.0,
            sampling: Sampling::default(),
            log_enabled: true,
            eval_accuracy: false,
            verbose: false,
        }
    }
}

impl ProxSgdConfig {
    /// Check the configuration against a problem with `n` samples.
    pub fn validate(&self, n: usize) -> Result<()> {
        check_common(n, self.eta, self.eta_comp, self.lambda, self.max_num_epoch)?;
        check_batch("batch_size", self.batch_size, n)?;
        if !(self.eta_prime >= 0.0) {
            return Err(OptimError::invalid(format!(
                "eta_prime must be non-negative, got {}",
                self.eta_prime
            )));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "eta={} eta_prime={} eta_comp={} lambda={:e} batch_size={} max_num_epoch={}",
            self.eta, self.eta_prime, self.eta_comp, self.lambda, self.batch_size, self.max_num_epoch
        )
    }
}

/// Hyperparameters of the ProxSARAH-Adaptive driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxSarahConfig {
    /// Fixed proximal learning rate η.
    pub eta: f64,
    pub eta_comp: f64,
    pub lambda: f64,
    /// Lipschitz constant of the component gradients. Falls back to the
    /// loss's own estimate when unset.
    pub lipschitz: Option<f64>,
    /// Terminal value of the adaptive step-size sequence.
    pub gamma_m: f64,
    pub max_inner: usize,
    /// Batch for the outer gradient estimator; `None` means the full gradient.
    pub grad_batch_size: Option<usize>,
    /// Batch for each inner gradient difference.
    pub inner_batch_size: usize,
    pub max_num_epoch: f64,
    pub sampling: Sampling,
    pub log_enabled: bool,
    pub eval_accuracy: bool,
    pub verbose: bool,
}

impl Default for ProxSarahConfig {
    fn default() -> Self {
        Self {
            eta: 0.5,
            eta_comp: 0.5,
            lambda: 0.0,
            lipschitz: None,
            gamma_m: 0.5,
            max_inner: 100,
            grad_batch_size: None,
            inner_batch_size: 10,
            max_num_epoch: 10.0,
            sampling: Sampling::default(),
            log_enabled: true,
            eval_accuracy: false,
            verbose: false,
        }
    }
}

impl ProxSarahConfig {
    /// Check everything except the Lipschitz constant, which is resolved
    /// against the loss at run time.
    pub fn validate(&self, n: usize) -> Result<()> {
        check_common(n, self.eta, self.eta_comp, self.lambda, self.max_num_epoch)?;
        if let Some(b) = self.grad_batch_size {
            check_batch("grad_batch_size", b, n)?;
        }
        check_batch("inner_batch_size", self.inner_batch_size, n)?;
        if self.inner_batch_size == n {
            return Err(OptimError::invalid(format!(
                "inner_batch_size must be smaller than the sample size {n} for the adaptive step sizes"
            )));
        }
        if !(self.gamma_m > 0.0) {
            return Err(OptimError::invalid(format!(
                "gamma_m must be positive, got {}",
                self.gamma_m
            )));
        }
        if let Some(l) = self.lipschitz {
            check_lipschitz(l)?;
        }
        Ok(())
    }

    /// Outer estimator batch, `n` when no subsampling is configured.
    pub fn outer_batch(&self, n: usize) -> usize {
        self.grad_batch_size.unwrap_or(n)
    }

    pub fn summary(&self) -> String {
        let outer = self
            .grad_batch_size
            .map_or_else(|| "full".to_string(), |b| b.to_string());
        format!(
            "eta={} eta_comp={} lambda={:e} gamma_m={} max_inner={} grad_batch_size={} inner_batch_size={} max_num_epoch={}",
            self.eta,
            self.eta_comp,
            self.lambda,
            self.gamma_m,
            self.max_inner,
            outer,
            self.inner_batch_size,
            self.max_num_epoch
        )
    }
}

pub(crate) fn check_lipschitz(l: f64) -> Result<()> {
    if l > 0.0 && l.is_finite() {
        Ok(())
    } else {
        Err(OptimError::invalid(format!(
            "Lipschitz constant must be positive and finite, got {l}"
        )))
    }
}

fn check_common(n: usize, eta: f64, eta_comp: f64, lambda: f64, max_num_epoch: f64) -> Result<()> {
    if n == 0 {
        return Err(OptimError::invalid("problem has no samples"));
    }
    if !(eta > 0.0) {
        return Err(OptimError::invalid(format!("eta must be positive, got {eta}")));
    }
    if !(eta_comp > 0.0) {
        return Err(OptimError::invalid(format!(
            "eta_comp must be positive, got {eta_comp}"
        )));
    }
    if !(lambda >= 0.0) {
        return Err(OptimError::invalid(format!(
            "lambda must be non-negative, got {lambda}"
        )));
    }
    if !(max_num_epoch > 0.0) {
        return Err(OptimError::invalid(format!(
            "max_num_epoch must be positive, got {max_num_epoch}"
        )));
    }
    Ok(())
}

fn check_batch(name: &str, b: usize, n: usize) -> Result<()> {
    if b == 0 || b > n {
        return Err(OptimError::invalid(format!(
            "{name} must be in (0, {n}], got {b}"
        )));
    }
    Ok(())
}

/// Where the binaries get their training data from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    Synthetic {
        samples: usize,
        features: usize,
        noise: f64,
    },
    Libsvm {
        path: String,
        features: Option<usize>,
    },
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::Synthetic {
            samples: 1000,
            features: 20,
            noise: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    #[default]
    Logistic,
    Tanh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    None,
    #[default]
    L1,
    L2,
    NonNegative,
}

/// Experiment configuration loaded from a TOML or JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Falls back to the `SEED` environment variable when unset.
    pub seed: Option<u64>,
    pub data: DataSource,
    pub loss: LossKind,
    pub penalty: PenaltyKind,
    /// Fraction of samples held out for test accuracy; 0 disables the split.
    pub test_fraction: f64,
    pub normalize: bool,
    pub sgd: ProxSgdConfig,
    pub sarah: ProxSarahConfig,
    /// Root directory for metric files; the binaries default to `runs`.
    pub log_dir: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            data: DataSource::default(),
            loss: LossKind::default(),
            penalty: PenaltyKind::default(),
            test_fraction: 0.2,
            normalize: true,
            sgd: ProxSgdConfig::default(),
            sarah: ProxSarahConfig::default(),
            log_dir: None,
        }
    }
}

impl RunConfig {
    /// Load configuration from the given path. Supports TOML or JSON based on
    /// the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_on_reasonable_problem() {
        assert!(ProxSgdConfig::default().validate(100).is_ok());
        assert!(ProxSarahConfig::default().validate(100).is_ok());
    }

    #[test]
    fn batch_larger_than_n_is_rejected() {
        let cfg = ProxSgdConfig {
            batch_size: 101,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(100),
            Err(OptimError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn full_inner_batch_is_rejected() {
        let cfg = ProxSarahConfig {
            inner_batch_size: 50,
            ..Default::default()
        };
        assert!(cfg.validate(50).is_err());
        assert!(cfg.validate(51).is_ok());
    }

    #[test]
    fn nan_learning_rate_is_rejected() {
        let cfg = ProxSgdConfig {
            eta: f64::NAN,
            ..Default::default()
        };
        assert!(cfg.validate(10).is_err());
    }

    #[test]
    fn outer_batch_defaults_to_n() {
        let cfg = ProxSarahConfig::default();
        assert_eq!(cfg.outer_batch(37), 37);
        let cfg = ProxSarahConfig {
            grad_batch_size: Some(8),
            ..Default::default()
        };
        assert_eq!(cfg.outer_batch(37), 8);
    }
}
