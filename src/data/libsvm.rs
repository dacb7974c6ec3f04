//! Reader for the sparse LIBSVM text format, `label idx:val idx:val ...`
//! with 1-based feature indices.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{OptimError, Result};
use crate::math::Matrix;

use super::Dataset;

/// Largest `rows * cols` accepted by the loader, 1 GiB of `f64`.
pub const MAX_DENSE_ENTRIES: usize = 1 << 27;

/// Load a two-class LIBSVM file. `dim` fixes the feature count; otherwise
/// the largest index in the file is used.
///
/// Samples are stored densely, so very wide sparse sets (rcv1, news20) are
/// out of reach: anything above [`MAX_DENSE_ENTRIES`] is rejected with
/// [`OptimError::InvalidConfiguration`].
pub fn load_libsvm(path: impl AsRef<Path>, dim: Option<usize>) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let data = parse_libsvm(BufReader::new(file), dim)?;
    log::info!(
        "loaded {} samples with {} features from {}",
        data.len(),
        data.dim(),
        path.display()
    );
    Ok(data)
}

/// Parse LIBSVM lines from any reader.
///
/// Labels are mapped to `{-1, +1}`: the smaller of two distinct label
/// values becomes `-1`. A file with a single label value keeps its sign.
pub fn parse_libsvm<R: BufRead>(reader: R, dim: Option<usize>) -> Result<Dataset> {
    let mut raw_labels = Vec::new();
    let mut rows: Vec<Vec<(usize, f64)>> = Vec::new();
    let mut max_idx = 0usize;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let parse_err = |message: String| OptimError::Parse {
            line: lineno + 1,
            message,
        };
        let mut tokens = line.split_whitespace();
        let label = tokens
            .next()
            .ok_or_else(|| parse_err("missing label".into()))?;
        let label: f64 = label
            .parse()
            .map_err(|_| parse_err(format!("bad label `{label}`")))?;

        let mut row = Vec::new();
        for tok in tokens {
            let (idx, val) = tok
                .split_once(':')
                .ok_or_else(|| parse_err(format!("expected idx:val, got `{tok}`")))?;
            let idx: usize = idx
                .parse()
                .map_err(|_| parse_err(format!("bad feature index `{idx}`")))?;
            if idx == 0 {
                return Err(parse_err("feature indices are 1-based".into()));
            }
            if let Some(d) = dim {
                if idx > d {
                    return Err(parse_err(format!("feature index {idx} exceeds dimension {d}")));
                }
            }
            let val: f64 = val
                .parse()
                .map_err(|_| parse_err(format!("bad feature value `{val}`")))?;
            max_idx = max_idx.max(idx);
            row.push((idx - 1, val));
        }
        raw_labels.push(label);
        rows.push(row);
    }

    let labels = map_labels(&raw_labels)?;
    let cols = dim.unwrap_or(max_idx);
    match rows.len().checked_mul(cols) {
        Some(entries) if entries <= MAX_DENSE_ENTRIES => {}
        _ => {
            return Err(OptimError::invalid(format!(
                "{} x {cols} samples exceed the dense limit of {MAX_DENSE_ENTRIES} entries",
                rows.len()
            )))
        }
    }
    let mut features = Matrix::zeros(rows.len(), cols);
    for (r, row) in rows.iter().enumerate() {
        for &(c, v) in row {
            features.set(r, c, v);
        }
    }
    Dataset::new(features, labels)
}

fn map_labels(raw: &[f64]) -> Result<Vec<f64>> {
    let mut distinct: Vec<f64> = Vec::new();
    for &l in raw {
        if !distinct.contains(&l) {
            distinct.push(l);
        }
    }
    match distinct.len() {
        0 => Ok(Vec::new()),
        1 => Ok(raw.iter().map(|&l| if l > 0.0 { 1.0 } else { -1.0 }).collect()),
        2 => {
            let low = distinct[0].min(distinct[1]);
            Ok(raw.iter().map(|&l| if l == low { -1.0 } else { 1.0 }).collect())
        }
        k => Err(OptimError::invalid(format!(
            "expected a two-class problem, found {k} label values"
        ))),
    }
}
