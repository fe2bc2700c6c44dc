use crate::error::FitError;
use crate::triangle::Triangle;

/// Deterministic chain ladder development model fitted to a cumulative
/// claims triangle.
///
/// Link ratios are volume-weighted: `f_j = Σ_i cum[i, j+1] / Σ_i cum[i, j]`
/// over the origins where both cells are observed. The fitted cumulative
/// triangle is reconstructed from the latest diagonal — backwards by
/// dividing out link ratios, forwards to ultimate by multiplying them in —
/// so its expectation covers every cell, including the unobserved future
/// region used for process-variance injection.
#[derive(Debug, Clone)]
pub struct ChainLadderModel {
    link_ratios: Vec<f64>,
    ultimates: Vec<f64>,
    latest: Vec<f64>,
    fitted_cumulative: Triangle,
}

impl ChainLadderModel {
    pub fn fit(cumulative: &Triangle) -> Result<Self, FitError> {
        let n = cumulative.n();

        let mut link_ratios = Vec::with_capacity(n - 1);
        for j in 0..n - 1 {
            // Origins with both (i, j) and (i, j+1) observed: i + j + 1 < n.
            let mut num = 0.0;
            let mut den = 0.0;
            for i in 0..n - 1 - j {
                num += cumulative.get(i, j + 1);
                den += cumulative.get(i, j);
            }
            if den == 0.0 {
                return Err(FitError::ZeroColumn { dev: j });
            }
            let f = num / den;
            if !f.is_finite() {
                return Err(FitError::NonFiniteRatio { dev: j });
            }
            link_ratios.push(f);
        }

        let latest = cumulative.latest_diagonal();
        let mut ultimates = Vec::with_capacity(n);
        for (i, &diag) in latest.iter().enumerate() {
            let mut ult = diag;
            for &f in &link_ratios[n - 1 - i..] {
                ult *= f;
            }
            ultimates.push(ult);
        }

        let mut fitted_cumulative = Triangle::zeros(n);
        for (i, &diag) in latest.iter().enumerate() {
            let last = cumulative.last_observed_dev(i);
            fitted_cumulative.set(i, last, diag);
            for j in (0..last).rev() {
                let next = fitted_cumulative.get(i, j + 1);
                let f = link_ratios[j];
                // A non-positive ratio cannot be divided out; carry the value back.
                fitted_cumulative.set(i, j, if f > 0.0 { next / f } else { next });
            }
            for j in last + 1..n {
                let prev = fitted_cumulative.get(i, j - 1);
                fitted_cumulative.set(i, j, prev * link_ratios[j - 1]);
            }
        }

        Ok(ChainLadderModel { link_ratios, ultimates, latest, fitted_cumulative })
    }

    /// Age-to-age development factors, length `n − 1`.
    pub fn link_ratios(&self) -> &[f64] {
        &self.link_ratios
    }

    /// Fully developed claim total per origin.
    pub fn ultimates(&self) -> &[f64] {
        &self.ultimates
    }

    /// Most recent observed cumulative value per origin.
    pub fn latest_diagonal(&self) -> &[f64] {
        &self.latest
    }

    /// Model expectation for every cell, cumulative representation.
    pub fn fitted_cumulative(&self) -> &Triangle {
        &self.fitted_cumulative
    }

    /// Model expectation for every cell, incremental representation.
    pub fn fitted_incremental(&self) -> Triangle {
        self.fitted_cumulative.cum_to_incr()
    }

    /// Σ over origins of (ultimate − latest diagonal).
    pub fn reserve(&self) -> f64 {
        self.ultimates
            .iter()
            .zip(&self.latest)
            .map(|(u, l)| u - l)
            .sum()
    }
}
