use rand::Rng;
use rand_distr::{Distribution, Gamma};
use serde::Serialize;

use crate::chainladder::ChainLadderModel;
use crate::error::FitError;
use crate::triangle::Triangle;

/// How a re-fitted model's reserve is read off. Fixed once per engine;
/// iterations never mix modes — doing so would blend two different variance
/// structures into one distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProjectionMode {
    /// Σ over origins of (ultimate − latest diagonal). Estimation variance
    /// only — the reserve is the deterministic projection of the synthetic
    /// triangle.
    UltimateMinusLatest,
    /// Each unobserved future payment is drawn from a Gamma with the model
    /// expectation as mean and `expectation × phi` as variance
    /// (shape = mean / phi, scale = phi), then summed. Estimation plus
    /// process variance.
    GammaProcessVariance,
}

/// Re-fit a development model to a synthetic cumulative triangle and compute
/// the projected reserve. Fit failures (degenerate synthetic triangles)
/// surface as `FitError` so the runner can skip the iteration.
pub fn project_reserve(
    cumulative: &Triangle,
    mode: ProjectionMode,
    phi: f64,
    rng: &mut impl Rng,
) -> Result<f64, FitError> {
    let model = ChainLadderModel::fit(cumulative)?;
    Ok(match mode {
        ProjectionMode::UltimateMinusLatest => model.reserve(),
        ProjectionMode::GammaProcessVariance => gamma_future_cashflows(&model, phi, rng),
    })
}

/// Sum of Gamma-sampled future payments over all unobserved cells.
fn gamma_future_cashflows(model: &ChainLadderModel, phi: f64, rng: &mut impl Rng) -> f64 {
    let fitted = model.fitted_incremental();
    let n = fitted.n();
    let mut reserve = 0.0;
    for i in 0..n {
        for j in n - i..n {
            let expected = fitted.get(i, j);
            if !expected.is_finite() || expected <= 0.0 {
                continue;
            }
            if phi > 0.0 {
                let gamma =
                    Gamma::new(expected / phi, phi).expect("invalid Gamma params");
                reserve += gamma.sample(rng);
            } else {
                // Degenerate pool (every residual zero): no process noise to add.
                reserve += expected;
            }
        }
    }
    reserve
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn rng(seed: u64) -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(seed)
    }

    fn growing() -> Triangle {
        Triangle::from_rows(&[
            vec![100.0, 200.0, 220.0],
            vec![110.0, 230.0],
            vec![120.0],
        ])
        .unwrap()
    }

    // ── Estimation-only mode ──────────────────────────────────────────────────

    #[test]
    fn ultimate_minus_latest_matches_model_reserve() {
        let tri = growing();
        let expected = ChainLadderModel::fit(&tri).unwrap().reserve();
        let got =
            project_reserve(&tri, ProjectionMode::UltimateMinusLatest, 0.4, &mut rng(1))
                .unwrap();
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn ultimate_minus_latest_ignores_rng_state() {
        let tri = growing();
        let a = project_reserve(&tri, ProjectionMode::UltimateMinusLatest, 0.4, &mut rng(1))
            .unwrap();
        let b = project_reserve(&tri, ProjectionMode::UltimateMinusLatest, 0.4, &mut rng(2))
            .unwrap();
        assert_eq!(a, b, "estimation-only mode must be deterministic");
    }

    // ── Process-variance mode ─────────────────────────────────────────────────

    #[test]
    fn gamma_mode_with_zero_phi_collapses_to_expected_payments() {
        let tri = growing();
        let expected = ChainLadderModel::fit(&tri).unwrap().reserve();
        let got =
            project_reserve(&tri, ProjectionMode::GammaProcessVariance, 0.0, &mut rng(1))
                .unwrap();
        // Future increments sum to exactly ultimate − latest per origin.
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn gamma_mode_with_tiny_phi_concentrates_on_the_reserve() {
        let tri = growing();
        let expected = ChainLadderModel::fit(&tri).unwrap().reserve();
        let got =
            project_reserve(&tri, ProjectionMode::GammaProcessVariance, 1e-6, &mut rng(5))
                .unwrap();
        // Var = m·phi per cell, so the draw is within a fraction of a unit.
        assert!(
            (got - expected).abs() / expected < 1e-2,
            "tiny-phi Gamma draw {got} far from reserve {expected}"
        );
    }

    #[test]
    fn gamma_mode_varies_with_seed() {
        let tri = growing();
        let a = project_reserve(&tri, ProjectionMode::GammaProcessVariance, 0.5, &mut rng(1))
            .unwrap();
        let b = project_reserve(&tri, ProjectionMode::GammaProcessVariance, 0.5, &mut rng(2))
            .unwrap();
        assert_ne!(a, b, "process variance must inject seed-dependent noise");
    }

    #[test]
    fn gamma_mode_reproducible_for_same_seed() {
        let tri = growing();
        let a = project_reserve(&tri, ProjectionMode::GammaProcessVariance, 0.5, &mut rng(9))
            .unwrap();
        let b = project_reserve(&tri, ProjectionMode::GammaProcessVariance, 0.5, &mut rng(9))
            .unwrap();
        assert_eq!(a, b);
    }

    // ── Failure propagation ───────────────────────────────────────────────────

    #[test]
    fn collapsed_triangle_surfaces_fit_error() {
        let tri = Triangle::zeros(3);
        let err =
            project_reserve(&tri, ProjectionMode::UltimateMinusLatest, 0.4, &mut rng(1))
                .unwrap_err();
        assert!(matches!(err, FitError::ZeroColumn { .. }));
    }
}
