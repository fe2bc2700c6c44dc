use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::BootstrapConfig;
use crate::engine::Engine;
use crate::error::EngineError;

/// Cooperative cancellation flag shared with the caller.
///
/// Checked at iteration boundaries only; iterations already completed are
/// kept and the run returns a partial summary over them.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Distribution statistics over the completed reserve estimates.
/// Percentiles use linear interpolation between order statistics; `std` is
/// the population standard deviation.
#[derive(Debug, Clone, Serialize)]
pub struct ReserveStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub max: f64,
}

/// Aggregate outcome of a bootstrap run. `reserves` holds one estimate per
/// *successful* iteration in iteration order — failed and cancelled
/// iterations are counted, never padded with zeros or NaNs. `stats` is
/// `None` when nothing completed.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapSummary {
    pub n_requested: u64,
    pub n_completed: usize,
    pub n_failed: usize,
    pub n_skipped: usize,
    pub reserves: Vec<f64>,
    pub stats: Option<ReserveStats>,
}

/// Run `config.iterations` independent bootstrap iterations and summarise.
///
/// Iterations share only the read-only engine state and write into disjoint
/// result slots, so they fan out across the rayon pool. Each iteration's
/// randomness is a pure function of (base_seed, index) — execution order and
/// thread identity never influence the result.
pub fn run_bootstrap(
    engine: &Engine,
    config: &BootstrapConfig,
    cancel: &CancelToken,
) -> Result<BootstrapSummary, EngineError> {
    let outcomes: Vec<Option<Result<f64, EngineError>>> = (0..config.iterations)
        .into_par_iter()
        .map(|index| {
            if cancel.is_cancelled() {
                return None;
            }
            Some(engine.run_iteration(index, config.base_seed).map(|r| r.reserve))
        })
        .collect();

    summarize(config, outcomes)
}

/// Fold per-iteration outcomes into a summary, applying the failure policy:
/// record-and-skip by default, escalate past the threshold, or propagate the
/// first error under `fail_fast`.
pub(crate) fn summarize(
    config: &BootstrapConfig,
    outcomes: Vec<Option<Result<f64, EngineError>>>,
) -> Result<BootstrapSummary, EngineError> {
    let mut reserves = Vec::new();
    let mut n_failed = 0usize;
    let mut n_skipped = 0usize;

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            None => n_skipped += 1,
            Some(Ok(reserve)) => reserves.push(reserve),
            Some(Err(err)) => {
                if config.fail_fast {
                    return Err(err);
                }
                warn!("iteration {index} dropped: {err}");
                n_failed += 1;
            }
        }
    }

    let attempted = reserves.len() + n_failed;
    if attempted > 0 {
        let failure_rate = n_failed as f64 / attempted as f64;
        if failure_rate > config.max_failure_rate {
            return Err(EngineError::ExcessiveFailures {
                failed: n_failed,
                attempted,
                threshold: config.max_failure_rate,
            });
        }
    }

    let stats = reserve_stats(&reserves);
    Ok(BootstrapSummary {
        n_requested: config.iterations,
        n_completed: reserves.len(),
        n_failed,
        n_skipped,
        reserves,
        stats,
    })
}

fn reserve_stats(reserves: &[f64]) -> Option<ReserveStats> {
    if reserves.is_empty() {
        return None;
    }
    let mut sorted = reserves.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();

    let interp = |p: f64| -> f64 {
        let h = p * (n - 1) as f64;
        let lo = h.floor() as usize;
        let hi = (lo + 1).min(n - 1);
        let frac = h - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    };

    let mean = sorted.iter().sum::<f64>() / n as f64;
    let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

    Some(ReserveStats {
        mean,
        std: variance.sqrt(),
        min: sorted[0],
        p5: interp(0.05),
        p25: interp(0.25),
        p50: interp(0.50),
        p75: interp(0.75),
        p95: interp(0.95),
        max: sorted[n - 1],
    })
}
