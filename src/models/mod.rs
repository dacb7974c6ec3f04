pub mod margin;
pub mod penalty;
pub mod quadratic;

pub use margin::{MarginKind, MarginLoss};
pub use penalty::{penalty_for, L1Norm, NoPenalty, NonNegative, SquaredL2};
pub use quadratic::QuadraticLoss;

use crate::config::LossKind;

impl From<LossKind> for MarginKind {
    fn from(kind: LossKind) -> Self {
        match kind {
            LossKind::Logistic => MarginKind::Logistic,
            LossKind::Tanh => MarginKind::Tanh,
        }
    }
}
