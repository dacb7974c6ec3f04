use indicatif::{ProgressBar, ProgressStyle};

use crate::logging::{Callback, RunInfo};
use crate::optim::{History, Snapshot};

/// Progress bar over the epoch budget, in hundredths of an epoch.
pub struct EpochProgress {
    bar: Option<ProgressBar>,
}

impl EpochProgress {
    pub fn new() -> Self {
        Self { bar: None }
    }
}

impl Default for EpochProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn ticks(epoch: f64) -> u64 {
    (epoch * 100.0).round().max(0.0) as u64
}

impl Callback for EpochProgress {
    fn on_train_begin(&mut self, info: &RunInfo) {
        let pb = ProgressBar::new(ticks(info.max_num_epoch));
        if let Ok(style) =
            ProgressStyle::with_template("{prefix} [{bar:40}] {pos}/{len} {msg} ({elapsed})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_prefix(info.algorithm);
        self.bar = Some(pb);
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        if let Some(pb) = &self.bar {
            pb.set_position(ticks(snapshot.epoch));
            pb.set_message(format!("grad map {:.3e}", snapshot.grad_norm));
        }
    }

    fn on_train_end(&mut self, history: &History) {
        if let Some(pb) = self.bar.take() {
            let msg = match history.last() {
                Some(s) => format!("min grad map {:.3e}", s.min_grad_norm),
                None => "done".to_string(),
            };
            pb.finish_with_message(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_are_hundredths_of_an_epoch() {
        assert_eq!(ticks(0.0), 0);
        assert_eq!(ticks(1.234), 123);
        assert_eq!(ticks(10.0), 1000);
    }
}
