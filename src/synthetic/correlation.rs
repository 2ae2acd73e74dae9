//! Block correlation matrix for synthetic survey data.
//!
//! Layout for `n` topics (`2n × 2n`):
//!
//! ```text
//! | A  C |   A, B: random within-block correlations, unit diagonal
//! | Cᵀ B |   C:    constant cross-block correlation
//! ```
//!
//! Random blocks are not guaranteed to be positive-semi-definite, so a
//! candidate that fails validation is discarded and redrawn, up to
//! `max_attempts` times.

use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SurveyError};

/// Closed interval for uniform off-diagonal draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformRange {
    pub low: f64,
    pub high: f64,
}

impl UniformRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    fn validate(&self, what: &str) -> Result<()> {
        let in_bounds = |v: f64| v.is_finite() && (-1.0..=1.0).contains(&v);
        if !in_bounds(self.low) || !in_bounds(self.high) || self.low > self.high {
            return Err(SurveyError::config(format!(
                "{what} range [{}, {}] must satisfy -1 <= low <= high <= 1",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Validated correlation matrix: symmetric, unit diagonal, entries in
/// [-1, 1], smallest eigenvalue >= -tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    matrix: DMatrix<f64>,
    min_eigenvalue: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub reason: String,
    pub min_eigenvalue: f64,
    pub matrix: DMatrix<f64>,
}

impl CorrelationMatrix {
    pub fn validate(matrix: DMatrix<f64>, tolerance: f64) -> std::result::Result<Self, Rejection> {
        let reject = |reason: String, min_eigenvalue: f64, matrix: DMatrix<f64>| Rejection {
            reason,
            min_eigenvalue,
            matrix,
        };
        if !matrix.is_square() || matrix.nrows() == 0 {
            let reason = format!("matrix is {}x{}", matrix.nrows(), matrix.ncols());
            return Err(reject(reason, f64::NAN, matrix));
        }
        if matrix != matrix.transpose() {
            return Err(reject("matrix is not symmetric".into(), f64::NAN, matrix));
        }
        if let Some(bad) = matrix.iter().find(|v| !v.is_finite() || v.abs() > 1.0) {
            let reason = format!("entry {bad} outside [-1, 1]");
            return Err(reject(reason, f64::NAN, matrix));
        }
        if let Some(i) = (0..matrix.nrows()).find(|&i| matrix[(i, i)] != 1.0) {
            let reason = format!("diagonal entry {i} is {}", matrix[(i, i)]);
            return Err(reject(reason, f64::NAN, matrix));
        }
        let min_eigenvalue = min_eigenvalue(&matrix);
        if !(min_eigenvalue >= -tolerance) {
            let reason = format!("not positive-semi-definite (min eigenvalue {min_eigenvalue:e})");
            return Err(reject(reason, min_eigenvalue, matrix));
        }
        Ok(Self {
            matrix,
            min_eigenvalue,
        })
    }

    pub fn identity(dim: usize) -> Self {
        Self {
            matrix: DMatrix::identity(dim, dim),
            min_eigenvalue: 1.0,
        }
    }

    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn min_eigenvalue(&self) -> f64 {
        self.min_eigenvalue
    }
}

pub fn min_eigenvalue(matrix: &DMatrix<f64>) -> f64 {
    matrix.clone().symmetric_eigen().eigenvalues.min()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrixBuilder {
    /// Topics per block; the result is `2n × 2n`.
    pub n: usize,
    pub within: [UniformRange; 2],
    pub cross: f64,
    pub max_attempts: u32,
    pub tolerance: f64,
}

impl CorrelationMatrixBuilder {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;
    pub const DEFAULT_TOLERANCE: f64 = 1e-10;

    pub fn new(n: usize, within: [UniformRange; 2], cross: f64) -> Self {
        Self {
            n,
            within,
            cross,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validate_params(&self) -> Result<()> {
        if self.n == 0 {
            return Err(SurveyError::config("correlation block size must be at least 1"));
        }
        self.within[0].validate("first block")?;
        self.within[1].validate("second block")?;
        if !self.cross.is_finite() || !(-1.0..=1.0).contains(&self.cross) {
            return Err(SurveyError::config(format!(
                "cross-block constant {} outside [-1, 1]",
                self.cross
            )));
        }
        if self.max_attempts == 0 {
            return Err(SurveyError::config("max_attempts must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SurveyError::config("eigenvalue tolerance must be >= 0"));
        }
        Ok(())
    }

    /// Draw and validate; each rejected candidate is discarded whole.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CorrelationMatrix> {
        self.validate_params()?;
        let mut last: Option<Rejection> = None;
        for attempt in 1..=self.max_attempts {
            let a = self.draw_block(rng, self.within[0]);
            let b = self.draw_block(rng, self.within[1]);
            match CorrelationMatrix::validate(assemble(&a, &b, self.cross), self.tolerance) {
                Ok(m) => {
                    info!(
                        attempt,
                        dim = m.dim(),
                        min_eigenvalue = m.min_eigenvalue(),
                        "correlation matrix accepted"
                    );
                    return Ok(m);
                }
                Err(rejection) => {
                    debug!(attempt, reason = %rejection.reason, "correlation matrix rejected");
                    last = Some(rejection);
                }
            }
        }
        let (min_eigenvalue, matrix) = last
            .map(|r| (r.min_eigenvalue, format!("{:.4}", r.matrix)))
            .unwrap_or((f64::NAN, String::new()));
        Err(SurveyError::Construction {
            attempts: self.max_attempts,
            min_eigenvalue,
            matrix,
        })
    }

    /// Symmetric `n × n` block: uniform upper triangle mirrored, unit diagonal.
    fn draw_block<R: Rng + ?Sized>(&self, rng: &mut R, range: UniformRange) -> DMatrix<f64> {
        let n = self.n;
        let mut block = DMatrix::identity(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                let v = rng.random_range(range.low..=range.high);
                block[(i, j)] = v;
                block[(j, i)] = v;
            }
        }
        block
    }
}

/// `[[A, C], [Cᵀ, B]]` with `C` filled with `cross`.
pub fn assemble(a: &DMatrix<f64>, b: &DMatrix<f64>, cross: f64) -> DMatrix<f64> {
    let n = a.nrows();
    let m = b.nrows();
    let mut out = DMatrix::from_element(n + m, n + m, cross);
    out.view_mut((0, 0), (n, n)).copy_from(a);
    out.view_mut((n, n), (m, m)).copy_from(b);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn builder(n: usize) -> CorrelationMatrixBuilder {
        CorrelationMatrixBuilder::new(
            n,
            [UniformRange::new(0.3, 0.6), UniformRange::new(0.2, 0.5)],
            -0.1,
        )
    }

    #[test]
    fn assemble_places_blocks_and_constant() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.4, 0.4, 1.0]);
        let b = DMatrix::from_row_slice(2, 2, &[1.0, 0.7, 0.7, 1.0]);
        let m = assemble(&a, &b, -0.2);
        assert_eq!(m[(0, 1)], 0.4);
        assert_eq!(m[(2, 3)], 0.7);
        assert_eq!(m[(0, 3)], -0.2);
        assert_eq!(m[(3, 0)], -0.2);
        assert_eq!(m, m.transpose());
    }

    #[test]
    fn build_returns_valid_matrix() {
        let mut rng = StdRng::seed_from_u64(7);
        let m = builder(6).build(&mut rng).unwrap();
        assert_eq!(m.dim(), 12);
        let mat = m.as_matrix();
        assert_eq!(mat, &mat.transpose());
        for i in 0..12 {
            assert_eq!(mat[(i, i)], 1.0);
        }
        assert_eq!(mat[(0, 6)], -0.1);
        assert!(mat[(0, 1)] >= 0.3 && mat[(0, 1)] <= 0.6);
        assert!(mat[(6, 7)] >= 0.2 && mat[(6, 7)] <= 0.5);
        assert!(m.min_eigenvalue() >= -1e-10);
    }

    #[test]
    fn same_seed_same_matrix() {
        let b = builder(4);
        let m1 = b.build(&mut StdRng::seed_from_u64(42)).unwrap();
        let m2 = b.build(&mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(m1, m2);
    }

    #[test]
    fn impossible_structure_exhausts_attempts() {
        // v = all ones: vᵀMv <= 2 (5 + 20 * 0.1) - 2 * 25 * 0.9 < 0 for every draw.
        let b = CorrelationMatrixBuilder::new(
            5,
            [UniformRange::new(0.0, 0.1), UniformRange::new(0.0, 0.1)],
            -0.9,
        )
        .with_max_attempts(3);
        let err = b.build(&mut StdRng::seed_from_u64(1)).unwrap_err();
        match err {
            SurveyError::Construction {
                attempts,
                min_eigenvalue,
                matrix,
            } => {
                assert_eq!(attempts, 3);
                assert!(min_eigenvalue < 0.0);
                assert!(!matrix.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut rng = StdRng::seed_from_u64(0);
        let bad = [
            CorrelationMatrixBuilder { n: 0, ..builder(3) },
            CorrelationMatrixBuilder {
                within: [UniformRange::new(0.5, 0.2), UniformRange::new(0.0, 0.1)],
                ..builder(3)
            },
            CorrelationMatrixBuilder { cross: 1.5, ..builder(3) },
            builder(3).with_max_attempts(0),
            builder(3).with_tolerance(-1.0),
        ];
        for b in bad {
            assert!(matches!(b.build(&mut rng), Err(SurveyError::Config { .. })));
        }
    }

    #[test]
    fn validate_rejects_non_correlation_matrices() {
        let asym = DMatrix::from_row_slice(2, 2, &[1.0, 0.2, 0.3, 1.0]);
        assert!(CorrelationMatrix::validate(asym, 1e-10).is_err());
        let diag = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 1.0]);
        assert!(CorrelationMatrix::validate(diag, 1e-10).is_err());
        let indefinite = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.9, -0.9, 0.9, 1.0, 0.9, -0.9, 0.9, 1.0],
        );
        let rejection = CorrelationMatrix::validate(indefinite, 1e-10).unwrap_err();
        assert!(rejection.min_eigenvalue < 0.0);
        // singular but PSD is accepted
        let singular = DMatrix::from_element(3, 3, 1.0);
        assert!(CorrelationMatrix::validate(singular, 1e-10).is_ok());
    }
}
