use serde::Serialize;

use crate::error::EngineError;
use crate::triangle::Triangle;

/// One observed upper-triangle cell with a strictly positive fitted value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResidualEntry {
    pub origin: usize,
    pub dev: usize,
    /// Pearson residual: (actual − fitted) / sqrt(fitted).
    pub standardized: f64,
    /// After degrees-of-freedom scaling and mean-centering.
    pub adjusted: f64,
}

/// Centered, DOF-adjusted residual pool plus the ODP dispersion parameter.
///
/// Built once from the base (non-resampled) triangles and immutable for the
/// life of the engine. Pure function of its two inputs. Zero-valued
/// residuals stay in the pool: actual == fitted is a legitimate observation
/// and dropping it would shrink `n` under the DOF adjustment.
#[derive(Debug, Clone)]
pub struct ResidualPool {
    entries: Vec<ResidualEntry>,
    df: usize,
    phi: f64,
}

impl ResidualPool {
    /// Build the pool from actual and fitted *incremental* triangles of the
    /// same shape.
    ///
    /// Cells enter the pool iff they are observed (`i + j < n`), the fitted
    /// value is strictly positive, and the residual is finite — a residual
    /// that cannot be finitely computed is excluded, never zero-filled.
    /// Residuals are scaled by `sqrt(n / df)` with `df = max(n − p, 1)`,
    /// `p = n_dev − 1`, then centered to zero mean. The centering is load-
    /// bearing: an uncentered pool shifts every resampled reserve estimate.
    pub fn build(actual: &Triangle, fitted: &Triangle) -> Result<Self, EngineError> {
        let n = actual.n();
        debug_assert_eq!(n, fitted.n(), "actual and fitted triangles must share a shape");

        let mut entries = Vec::new();
        for i in 0..n {
            for j in 0..n - i {
                let f = fitted.get(i, j);
                if f <= 0.0 {
                    continue;
                }
                let r = (actual.get(i, j) - f) / f.sqrt();
                if !r.is_finite() {
                    continue;
                }
                entries.push(ResidualEntry { origin: i, dev: j, standardized: r, adjusted: r });
            }
        }
        if entries.is_empty() {
            return Err(EngineError::InsufficientData);
        }

        let n_res = entries.len();
        let p = n - 1; // one link ratio estimated per development step
        let df = n_res.saturating_sub(p).max(1);
        let scale = (n_res as f64 / df as f64).sqrt();
        for e in &mut entries {
            e.adjusted = e.standardized * scale;
        }

        let mean = entries.iter().map(|e| e.adjusted).sum::<f64>() / n_res as f64;
        for e in &mut entries {
            e.adjusted -= mean;
        }

        let phi = entries.iter().map(|e| e.standardized * e.standardized).sum::<f64>() / df as f64;

        Ok(ResidualPool { entries, df, phi })
    }

    /// Non-empty by construction.
    pub fn entries(&self) -> &[ResidualEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `max(n − p, 1)` degrees of freedom used for the scale adjustment.
    pub fn df(&self) -> usize {
        self.df
    }

    /// ODP dispersion parameter: Σ standardized² / df.
    pub fn phi(&self) -> f64 {
        self.phi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3×3 incremental triangles with hand-pickable residuals.
    fn actual_fitted() -> (Triangle, Triangle) {
        let actual = Triangle::from_rows(&[
            vec![104.0, 96.0, 100.0],
            vec![100.0, 108.0],
            vec![92.0],
        ])
        .unwrap();
        let fitted = Triangle::from_rows(&[
            vec![100.0, 100.0, 100.0],
            vec![100.0, 100.0],
            vec![100.0],
        ])
        .unwrap();
        (actual, fitted)
    }

    // ── Pool membership ───────────────────────────────────────────────────────

    #[test]
    fn pool_covers_observed_positive_fitted_cells() {
        let (actual, fitted) = actual_fitted();
        let pool = ResidualPool::build(&actual, &fitted).unwrap();
        assert_eq!(pool.len(), 6);
        let cells: Vec<(usize, usize)> =
            pool.entries().iter().map(|e| (e.origin, e.dev)).collect();
        assert_eq!(cells, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (2, 0)]);
    }

    #[test]
    fn zero_fitted_cell_is_excluded() {
        let (actual, mut fitted) = actual_fitted();
        fitted.set(0, 1, 0.0);
        let pool = ResidualPool::build(&actual, &fitted).unwrap();
        assert_eq!(pool.len(), 5);
        assert!(
            pool.entries().iter().all(|e| (e.origin, e.dev) != (0, 1)),
            "cell with fitted == 0 must not enter the pool"
        );
    }

    #[test]
    fn zero_residual_is_kept() {
        let (actual, fitted) = actual_fitted();
        // Cell (0,2) has actual == fitted == 100 → standardized residual 0.
        let pool = ResidualPool::build(&actual, &fitted).unwrap();
        let entry = pool
            .entries()
            .iter()
            .find(|e| (e.origin, e.dev) == (0, 2))
            .expect("zero residual must stay in the pool");
        assert_eq!(entry.standardized, 0.0);
    }

    #[test]
    fn empty_pool_is_an_error() {
        let (actual, _) = actual_fitted();
        let fitted = Triangle::zeros(3);
        let err = ResidualPool::build(&actual, &fitted).unwrap_err();
        assert_eq!(err, EngineError::InsufficientData);
    }

    // ── Scaling and centering ─────────────────────────────────────────────────

    #[test]
    fn standardized_residuals_are_pearson() {
        let (actual, fitted) = actual_fitted();
        let pool = ResidualPool::build(&actual, &fitted).unwrap();
        let e00 = &pool.entries()[0];
        // (104 − 100) / sqrt(100) = 0.4
        assert!((e00.standardized - 0.4).abs() < 1e-12);
    }

    #[test]
    fn adjusted_residuals_are_centered() {
        let (actual, fitted) = actual_fitted();
        let pool = ResidualPool::build(&actual, &fitted).unwrap();
        let mean: f64 =
            pool.entries().iter().map(|e| e.adjusted).sum::<f64>() / pool.len() as f64;
        assert!(mean.abs() < 1e-9, "adjusted pool mean {mean} must be ~0");
    }

    #[test]
    fn dof_adjustment_applied_before_centering() {
        let (actual, fitted) = actual_fitted();
        let pool = ResidualPool::build(&actual, &fitted).unwrap();
        // n = 6, p = 2, df = 4, scale = sqrt(6/4).
        assert_eq!(pool.df(), 4);
        let scale = (6.0f64 / 4.0).sqrt();
        let scaled: Vec<f64> =
            pool.entries().iter().map(|e| e.standardized * scale).collect();
        let mean = scaled.iter().sum::<f64>() / scaled.len() as f64;
        for (e, s) in pool.entries().iter().zip(&scaled) {
            assert!(
                (e.adjusted - (s - mean)).abs() < 1e-12,
                "adjusted must be scaled-then-centered"
            );
        }
    }

    #[test]
    fn df_floors_at_one() {
        // Only one usable cell: n = 1 ≤ p = 1, so df must floor at 1.
        let actual = Triangle::from_rows(&[vec![104.0, 0.0], vec![0.0]]).unwrap();
        let fitted = Triangle::from_rows(&[vec![100.0, 0.0], vec![0.0]]).unwrap();
        let pool = ResidualPool::build(&actual, &fitted).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.df(), 1);
    }

    #[test]
    fn phi_is_sum_of_squares_over_df() {
        let (actual, fitted) = actual_fitted();
        let pool = ResidualPool::build(&actual, &fitted).unwrap();
        let sum_sq: f64 =
            pool.entries().iter().map(|e| e.standardized * e.standardized).sum();
        assert!((pool.phi() - sum_sq / 4.0).abs() < 1e-12);
        assert!(pool.phi() > 0.0);
    }
}
