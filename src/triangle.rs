use serde::Serialize;

use crate::error::EngineError;

/// Square claims triangle: origin rows × development columns, row-major.
///
/// Cell `(i, j)` is observed iff `i + j < n`; the rest is the unobserved
/// future region, which holds zero until a model projects it. The same type
/// carries both the cumulative and the incremental representation — the two
/// are exact inverses under `cum_to_incr`/`incr_to_cum`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Triangle {
    n: usize,
    values: Vec<f64>,
}

impl Triangle {
    /// An n×n triangle of zeros.
    pub fn zeros(n: usize) -> Self {
        Triangle { n, values: vec![0.0; n * n] }
    }

    /// Build from ragged observed rows: row `i` must have exactly `n − i`
    /// cells, where `n` is the number of rows. Future cells start at zero.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, EngineError> {
        let n = rows.len();
        if n < 2 {
            return Err(EngineError::EmptyTriangle { origins: n, devs: n });
        }
        let mut tri = Triangle::zeros(n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n - i {
                return Err(EngineError::RaggedRows {
                    origin: i,
                    got: row.len(),
                    expected: n - i,
                });
            }
            for (j, &v) in row.iter().enumerate() {
                tri.set(i, j, v);
            }
        }
        Ok(tri)
    }

    /// Origin count == development count (square triangle).
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn get(&self, origin: usize, dev: usize) -> f64 {
        self.values[origin * self.n + dev]
    }

    pub fn set(&mut self, origin: usize, dev: usize, value: f64) {
        self.values[origin * self.n + dev] = value;
    }

    /// Upper-triangle predicate: `(i, j)` holds observed history.
    pub fn is_observed(&self, origin: usize, dev: usize) -> bool {
        origin + dev < self.n
    }

    /// Last observed development period for an origin row.
    pub fn last_observed_dev(&self, origin: usize) -> usize {
        self.n - 1 - origin
    }

    /// Period-over-period differences along each origin row
    /// (`incr[i][0] = cum[i][0]`).
    pub fn cum_to_incr(&self) -> Triangle {
        let mut out = Triangle::zeros(self.n);
        for i in 0..self.n {
            let mut prev = 0.0;
            for j in 0..self.n {
                let c = self.get(i, j);
                out.set(i, j, c - prev);
                prev = c;
            }
        }
        out
    }

    /// Running total along each origin row.
    pub fn incr_to_cum(&self) -> Triangle {
        let mut out = Triangle::zeros(self.n);
        for i in 0..self.n {
            let mut acc = 0.0;
            for j in 0..self.n {
                acc += self.get(i, j);
                out.set(i, j, acc);
            }
        }
        out
    }

    /// Most recent observed value per origin row: cell `(i, n − 1 − i)`.
    /// Meaningful on the cumulative representation.
    pub fn latest_diagonal(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.get(i, self.n - 1 - i)).collect()
    }
}
