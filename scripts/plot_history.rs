use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};

use serde::Deserialize;

#[derive(Deserialize)]
struct MetricRecord {
    algorithm: String,
    epoch: f64,
    grad_norm: f64,
    min_grad_norm: f64,
}

// Bars are on a log10 scale: squared gradient-mapping norms shrink by
// orders of magnitude over a run.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let mut args = env::args().skip(1);
    let path = args
        .next()
        .unwrap_or_else(|| "runs/example/metrics.jsonl".to_string());
    let use_min = args.next().as_deref() == Some("--min");

    let reader = BufReader::new(File::open(&path)?);
    let mut points = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let rec: MetricRecord = serde_json::from_str(&line)?;
        let v = if use_min { rec.min_grad_norm } else { rec.grad_norm };
        if v > 0.0 && v.is_finite() {
            points.push((rec.algorithm, rec.epoch, v.log10()));
        }
    }
    if points.is_empty() {
        log::warn!("no positive gradient-mapping values in {path}");
        return Ok(());
    }

    let lo = points.iter().map(|p| p.2).fold(f64::INFINITY, f64::min);
    let hi = points.iter().map(|p| p.2).fold(f64::NEG_INFINITY, f64::max);
    let span = (hi - lo).max(1e-12);
    for (alg, epoch, v) in &points {
        let bar = (((v - lo) / span) * 50.0).round() as usize;
        println!("{alg:<20} {epoch:8.3} | {:<51} 1e{v:.2}", "*".repeat(bar + 1));
    }
    Ok(())
}
