/// Fraction of strictly positive margins `y_i * x_i^T w`, i.e. the accuracy
/// of a sign classifier with labels in {-1, +1}.
pub fn margin_accuracy(margins: &[f64]) -> f64 {
    if margins.is_empty() {
        return 0.0;
    }
    let correct = margins.iter().filter(|&&m| m > 0.0).count();
    correct as f64 / margins.len() as f64
}

/// Running minimum of a sequence.
pub fn prefix_min(values: &[f64]) -> Vec<f64> {
    let mut best = f64::INFINITY;
    values
        .iter()
        .map(|&v| {
            best = best.min(v);
            best
        })
        .collect()
}
