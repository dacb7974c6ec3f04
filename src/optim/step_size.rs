use crate::config::check_lipschitz;
use crate::error::{OptimError, Result};

pub trait LearningRateSchedule {
    fn next_lr(&self, step: usize) -> f64;
}

/// `eta_k = eta_0 / (1 + eta' * floor(k / period))`
///
/// ProxSGD uses the sample size as the period, so the rate drops once every
/// `n` iterations.
pub struct DiminishingLr {
    base_lr: f64,
    decay: f64,
    period: usize,
}

impl DiminishingLr {
    pub fn new(base_lr: f64, decay: f64, period: usize) -> Self {
        Self {
            base_lr,
            decay,
            period: period.max(1),
        }
    }
}

impl LearningRateSchedule for DiminishingLr {
    fn next_lr(&self, step: usize) -> f64 {
        let drops = (step / self.period) as f64;
        self.base_lr / (1.0 + self.decay * drops)
    }
}

/// Step sizes `gamma_0 ..= gamma_m` of ProxSARAH-Adaptive.
///
/// Built backwards from the terminal value: each earlier entry depends on
/// the sum of all later ones,
///
/// ```text
/// M        = L (1 + 2 eta^2) (n - b) / (b (n - 1))
/// gamma_m  = terminal
/// gamma_t  = 1 / (L (eta + M * sum_{s > t} gamma_s))
/// ```
///
/// where `b` is the inner batch size. The sequence is not monotone in
/// general.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveStepSizes {
    gammas: Vec<f64>,
}

impl AdaptiveStepSizes {
    pub fn new(
        max_inner: usize,
        gamma_m: f64,
        lipschitz: f64,
        eta: f64,
        n: usize,
        inner_batch_size: usize,
    ) -> Result<Self> {
        check_lipschitz(lipschitz)?;
        if !(eta > 0.0) {
            return Err(OptimError::invalid(format!("eta must be positive, got {eta}")));
        }
        if !(gamma_m > 0.0 && gamma_m.is_finite()) {
            return Err(OptimError::invalid(format!(
                "gamma_m must be positive, got {gamma_m}"
            )));
        }
        // b = n makes M a 0/0 and n = 1 divides by zero.
        if n < 2 || inner_batch_size == 0 || inner_batch_size >= n {
            return Err(OptimError::invalid(format!(
                "adaptive step sizes need 0 < inner_batch_size < n, got inner_batch_size={inner_batch_size} n={n}"
            )));
        }

        let b = inner_batch_size as f64;
        let nf = n as f64;
        let m_const = lipschitz * (1.0 + 2.0 * eta * eta) * (nf - b) / (b * (nf - 1.0));

        let mut gammas = vec![0.0; max_inner + 1];
        gammas[max_inner] = gamma_m;
        let mut sum = gamma_m;
        for t in (0..max_inner).rev() {
            gammas[t] = 1.0 / (lipschitz * (eta + m_const * sum));
            sum += gammas[t];
        }

        if let Some(bad) = gammas.iter().find(|g| !(g.is_finite() && **g > 0.0)) {
            return Err(OptimError::invalid(format!(
                "adaptive step sizes produced a non-positive entry {bad}"
            )));
        }
        Ok(Self { gammas })
    }

    /// `gamma_t`; `t = 0` is the outer step.
    pub fn get(&self, t: usize) -> f64 {
        self.gammas[t]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.gammas
    }

    pub fn len(&self) -> usize {
        self.gammas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gammas.is_empty()
    }
}
