use serde::{Deserialize, Serialize};

/// Statistics recorded at one diagnostic checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Cumulative component gradients charged so far.
    pub num_grad: usize,
    /// `num_grad / n`
    pub epoch: f64,
    /// `f(w) + lambda * g(w)`
    pub train_loss: f64,
    /// Squared norm of the gradient mapping.
    pub grad_norm: f64,
    /// Smallest `grad_norm` seen up to and including this checkpoint.
    pub min_grad_norm: f64,
    pub train_acc: Option<f64>,
    pub test_acc: Option<f64>,
}

/// Append-only trajectory of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    records: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, snapshot: Snapshot) {
        self.records.push(snapshot);
    }

    pub fn records(&self) -> &[Snapshot] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.records.last()
    }

    pub fn num_grad(&self) -> Vec<usize> {
        self.records.iter().map(|s| s.num_grad).collect()
    }

    pub fn num_epoch(&self) -> Vec<f64> {
        self.column(|s| s.epoch)
    }

    pub fn train_loss(&self) -> Vec<f64> {
        self.column(|s| s.train_loss)
    }

    pub fn grad_norm(&self) -> Vec<f64> {
        self.column(|s| s.grad_norm)
    }

    pub fn min_grad_norm(&self) -> Vec<f64> {
        self.column(|s| s.min_grad_norm)
    }

    /// Train accuracies of the checkpoints that recorded one.
    pub fn train_acc(&self) -> Vec<f64> {
        self.records.iter().filter_map(|s| s.train_acc).collect()
    }

    pub fn test_acc(&self) -> Vec<f64> {
        self.records.iter().filter_map(|s| s.test_acc).collect()
    }

    fn column(&self, f: impl Fn(&Snapshot) -> f64) -> Vec<f64> {
        self.records.iter().map(f).collect()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
