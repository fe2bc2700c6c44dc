use thiserror::Error;

/// Development-model fit failure. A column that sums to zero (or produces a
/// non-finite ratio) leaves the link ratio undefined, so the triangle cannot
/// be developed. Synthetic triangles with many collapsed cells hit this.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FitError {
    #[error("development column {dev} sums to zero; link ratio undefined")]
    ZeroColumn { dev: usize },
    #[error("non-finite link ratio at development period {dev}")]
    NonFiniteRatio { dev: usize },
}

/// Engine failure taxonomy.
///
/// Errors during base setup (`EmptyTriangle`, `InsufficientData`, `Fit` on
/// the observed data) are fatal — there is no reserve distribution without a
/// valid base fit. `Projection` is scoped to a single bootstrap iteration and
/// recoverable: the runner records it, drops that iteration's reserve, and
/// escalates to `ExcessiveFailures` only past the configured threshold.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("triangle too small: {origins} origin × {devs} development periods (need at least 2×2)")]
    EmptyTriangle { origins: usize, devs: usize },

    #[error("ragged triangle: origin {origin} has {got} cells, expected {expected}")]
    RaggedRows { origin: usize, got: usize, expected: usize },

    #[error("residual pool is empty: no observed cell has a positive fitted value and a finite residual")]
    InsufficientData,

    #[error("chain ladder fit failed: {0}")]
    Fit(#[from] FitError),

    #[error("iteration {iteration}: projection failed: {source}")]
    Projection { iteration: u64, source: FitError },

    #[error("{failed} of {attempted} iterations failed projection, above the {threshold} threshold")]
    ExcessiveFailures { failed: usize, attempted: usize, threshold: f64 },
}
