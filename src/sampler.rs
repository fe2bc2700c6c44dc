use rand::Rng;
use serde::Serialize;

use crate::error::EngineError;
use crate::residuals::ResidualPool;
use crate::triangle::Triangle;

/// Provenance for one resampled cell.
///
/// `sampled_from_*` identify the pool entry that was drawn; `sequence` is
/// the draw index under row-major traversal of the observed cells. Replay
/// consumers (draw-by-draw visualisation) rely on both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleRecord {
    pub origin: usize,
    pub dev: usize,
    pub fitted: f64,
    pub sampled_residual: f64,
    pub sampled_from_origin: usize,
    pub sampled_from_dev: usize,
    pub bootstrap_value: f64,
    pub sequence: usize,
}

/// Everything one bootstrap iteration produced. Never mutated after
/// creation; callers that only need summary statistics may discard it
/// immediately.
#[derive(Debug, Clone, Serialize)]
pub struct IterationResult {
    pub iteration: u64,
    pub records: Vec<SampleRecord>,
    pub incremental: Triangle,
    pub cumulative: Triangle,
    pub reserve: f64,
}

/// Resample a synthetic incremental triangle from the residual pool.
///
/// Traversal is row-major over the observed cells. For each cell with
/// `fitted > 0`, one pool index is drawn uniformly with replacement and the
/// cell is reconstructed as `max(0, fitted + r·sqrt(fitted))` — claim
/// payments cannot synthesize as negative. Cells with `fitted ≤ 0` stay at
/// zero, matching their exclusion from the pool.
pub fn sample_triangle(
    pool: &ResidualPool,
    fitted_incremental: &Triangle,
    rng: &mut impl Rng,
) -> Result<(Triangle, Vec<SampleRecord>), EngineError> {
    let entries = pool.entries();
    if entries.is_empty() {
        return Err(EngineError::InsufficientData);
    }

    let n = fitted_incremental.n();
    let mut incremental = Triangle::zeros(n);
    let mut records = Vec::new();

    for i in 0..n {
        for j in 0..n - i {
            let fitted = fitted_incremental.get(i, j);
            if fitted <= 0.0 {
                continue;
            }
            let drawn = entries[rng.random_range(0..entries.len())];
            let bootstrap_value = (fitted + drawn.adjusted * fitted.sqrt()).max(0.0);
            incremental.set(i, j, bootstrap_value);
            records.push(SampleRecord {
                origin: i,
                dev: j,
                fitted,
                sampled_residual: drawn.adjusted,
                sampled_from_origin: drawn.origin,
                sampled_from_dev: drawn.dev,
                bootstrap_value,
                sequence: records.len(),
            });
        }
    }

    Ok((incremental, records))
}
