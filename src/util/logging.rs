use crate::logging::{Callback, RunInfo};
use crate::optim::{History, Snapshot};

/// Format a message reporting the total number of matrix operations.
pub fn format_total_ops(count: usize) -> String {
    format!("Total matrix ops: {}", count)
}

/// Log the total number of matrix operations at info level.
pub fn log_total_ops(count: usize) {
    log::info!("{}", format_total_ops(count));
}

pub fn format_header() -> String {
    format!(
        "{:>8} | {:>13} | {:>13} | {:>9} | {:>9}",
        "Epoch", "Train Loss", "||Grad Map||^2", "Train Acc", "Test Acc"
    )
}

fn format_acc(acc: Option<f64>) -> String {
    match acc {
        Some(a) => format!("{:>9.4}", a),
        None => format!("{:>9}", "N/A"),
    }
}

/// One table row for a snapshot. Accuracy columns read `N/A` when the
/// snapshot carries none.
pub fn format_snapshot_row(s: &Snapshot) -> String {
    format!(
        "{:>8.3} | {:>13.6e} | {:>13.6e} | {} | {}",
        s.epoch,
        s.train_loss,
        s.grad_norm,
        format_acc(s.train_acc),
        format_acc(s.test_acc)
    )
}

pub fn format_summary(algorithm: &str, history: &History) -> String {
    match history.last() {
        Some(s) => format!(
            "{algorithm}: {} checkpoints, final loss {:.6e}, min ||Grad Map||^2 {:.6e} after {:.3} epochs",
            history.len(),
            s.train_loss,
            s.min_grad_norm,
            s.epoch
        ),
        None => format!("{algorithm}: no checkpoints recorded"),
    }
}

/// Prints the per-checkpoint table through the `log` facade.
pub struct TableLogger {
    show_accuracy: bool,
    algorithm: &'static str,
}

impl TableLogger {
    pub fn new(show_accuracy: bool) -> Self {
        Self {
            show_accuracy,
            algorithm: "",
        }
    }
}

impl Callback for TableLogger {
    fn on_train_begin(&mut self, info: &RunInfo) {
        self.algorithm = info.algorithm;
        log::info!(
            "{} on n={} d={} for {} epochs",
            info.algorithm,
            info.num_samples,
            info.dim,
            info.max_num_epoch
        );
        log::info!("{}", format_header());
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        if self.show_accuracy {
            log::info!("{}", format_snapshot_row(snapshot));
        } else {
            let bare = Snapshot {
                train_acc: None,
                test_acc: None,
                ..snapshot.clone()
            };
            log::info!("{}", format_snapshot_row(&bare));
        }
    }

    fn on_train_end(&mut self, history: &History) {
        log::info!("{}", format_summary(self.algorithm, history));
    }
}
