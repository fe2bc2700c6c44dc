use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::chainladder::ChainLadderModel;
use crate::config::BootstrapConfig;
use crate::error::EngineError;
use crate::projector::{self, ProjectionMode};
use crate::residuals::{ResidualEntry, ResidualPool};
use crate::runner::{self, BootstrapSummary, CancelToken};
use crate::sampler::{self, IterationResult};
use crate::triangle::Triangle;

/// Immutable bootstrap engine handle.
///
/// Construction fits the base chain ladder model, derives the fitted
/// incremental expectations, and builds the centered residual pool — all
/// fatal on failure, since no reserve distribution exists without a valid
/// base fit. After that the handle never changes: `run_iteration` and
/// `run_bootstrap` are pure functions of the handle plus (index, seed), so
/// iterations can run in any order, or in parallel, with identical results.
#[derive(Debug)]
pub struct Engine {
    actual_cumulative: Triangle,
    actual_incremental: Triangle,
    fitted_incremental: Triangle,
    base_model: ChainLadderModel,
    pool: ResidualPool,
    mode: ProjectionMode,
}

impl Engine {
    pub fn new(cumulative: Triangle, mode: ProjectionMode) -> Result<Self, EngineError> {
        let n = cumulative.n();
        if n < 2 {
            return Err(EngineError::EmptyTriangle { origins: n, devs: n });
        }
        let base_model = ChainLadderModel::fit(&cumulative)?;
        let actual_incremental = cumulative.cum_to_incr();
        let fitted_incremental = base_model.fitted_incremental();
        let pool = ResidualPool::build(&actual_incremental, &fitted_incremental)?;
        Ok(Engine {
            actual_cumulative: cumulative,
            actual_incremental,
            fitted_incremental,
            base_model,
            pool,
            mode,
        })
    }

    /// Seed for one iteration's RNG stream: a pure function of
    /// (base_seed, index), never of execution order or thread identity.
    pub fn iteration_seed(base_seed: u64, index: u64) -> u64 {
        base_seed.wrapping_add(index)
    }

    /// Run one bootstrap iteration: resample a synthetic triangle, re-fit,
    /// and project its reserve. Deterministic given (index, base_seed).
    pub fn run_iteration(
        &self,
        index: u64,
        base_seed: u64,
    ) -> Result<IterationResult, EngineError> {
        let mut rng = ChaCha20Rng::seed_from_u64(Self::iteration_seed(base_seed, index));
        let (incremental, records) =
            sampler::sample_triangle(&self.pool, &self.fitted_incremental, &mut rng)?;
        let cumulative = incremental.incr_to_cum();
        let reserve = projector::project_reserve(&cumulative, self.mode, self.pool.phi(), &mut rng)
            .map_err(|source| EngineError::Projection { iteration: index, source })?;
        Ok(IterationResult { iteration: index, records, incremental, cumulative, reserve })
    }

    /// Run a full bootstrap per the config. See `runner::run_bootstrap`.
    pub fn run_bootstrap(&self, config: &BootstrapConfig) -> Result<BootstrapSummary, EngineError> {
        runner::run_bootstrap(self, config, &CancelToken::new())
    }

    /// As `run_bootstrap`, with a cancellation token checked at iteration
    /// boundaries; a cancelled run returns a partial summary.
    pub fn run_bootstrap_with_cancel(
        &self,
        config: &BootstrapConfig,
        cancel: &CancelToken,
    ) -> Result<BootstrapSummary, EngineError> {
        runner::run_bootstrap(self, config, cancel)
    }

    /// Read-only snapshot of the residual pool for diagnostics consumers.
    pub fn residual_pool(&self) -> &[ResidualEntry] {
        self.pool.entries()
    }

    /// ODP dispersion parameter of the base fit.
    pub fn scale_parameter(&self) -> f64 {
        self.pool.phi()
    }

    /// Deterministic chain ladder reserve of the base (non-resampled) fit.
    pub fn base_reserve(&self) -> f64 {
        self.base_model.reserve()
    }

    /// Age-to-age factors of the base fit (diagnostic use).
    pub fn link_ratios(&self) -> &[f64] {
        self.base_model.link_ratios()
    }

    pub fn n(&self) -> usize {
        self.actual_cumulative.n()
    }

    pub fn actual_cumulative(&self) -> &Triangle {
        &self.actual_cumulative
    }

    pub fn actual_incremental(&self) -> &Triangle {
        &self.actual_incremental
    }

    pub fn fitted_incremental(&self) -> &Triangle {
        &self.fitted_incremental
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }
}
