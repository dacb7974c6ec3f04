use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::Sampling;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Create a [`StdRng`] seeded from the `SEED` environment variable.
///
/// Each call uses a unique seed derived from the base seed and an
/// incrementing counter to ensure deterministic yet distinct streams.
pub fn rng_from_env() -> StdRng {
    let base = std::env::var("SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let idx = COUNTER.fetch_add(1, Ordering::SeqCst);
    StdRng::seed_from_u64(stream_seed(base, idx))
}

fn stream_seed(base: u64, idx: u64) -> u64 {
    base.wrapping_add(idx)
}

/// Use `seed` when given, otherwise fall back to [`rng_from_env`].
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => rng_from_env(),
    }
}

/// Draw `b` sample indices out of `0..n`.
///
/// A batch covering the whole sample set is returned in natural order so
/// that full-batch steps sum in the same order as the full gradient.
pub fn sample_batch<R: Rng>(rng: &mut R, n: usize, b: usize, sampling: Sampling) -> Vec<usize> {
    match sampling {
        Sampling::WithoutReplacement if b >= n => (0..n).collect(),
        Sampling::WithoutReplacement => index::sample(rng, n, b).into_vec(),
        Sampling::WithReplacement => (0..b).map(|_| rng.gen_range(0..n)).collect(),
    }
}
