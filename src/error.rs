use thiserror::Error;

use crate::optim::Snapshot;

/// Errors raised by the optimizers and their supporting I/O.
#[derive(Debug, Error)]
pub enum OptimError {
    /// Hyperparameters or problem dimensions that the algorithms cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A NaN or infinity showed up at a checkpoint. `last` is the most recent
    /// snapshot recorded before the failure, if any.
    #[error("numeric divergence at epoch {epoch:.4}: non-finite {what}")]
    NumericDivergence {
        epoch: f64,
        what: &'static str,
        last: Option<Box<Snapshot>>,
    },

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl OptimError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        OptimError::InvalidConfiguration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, OptimError>;
