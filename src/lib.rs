//! Stochastic proximal-gradient methods for composite problems
//! `min_w f(w) + lambda * g(w)` where `f` is an average of smooth, possibly
//! nonconvex, component losses and `g` has a cheap proximal operator.
//!
//! Two drivers are provided, [`ProxSgd`] and [`ProxSarah`]. Both report
//! progress through the squared norm of the gradient mapping, recorded
//! once per pass over the data.

pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod math;
pub mod metrics;
pub mod models;
pub mod optim;
pub mod rng;
pub mod util;

pub use config::{ProxSarahConfig, ProxSgdConfig, RunConfig, Sampling};
pub use error::{OptimError, Result};
pub use logging::{Callback, Logger, RunInfo};
pub use optim::{
    gradient_mapping_norm_sq, Accuracy, CompositeProblem, History, Optimizer, ProxSarah, ProxSgd,
    Regularizer, RunOutput, SmoothLoss, Snapshot,
};
