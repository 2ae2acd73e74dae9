//! Multivariate normal sampling keyed on a factor `L` with `L Lᵀ = D R D`.
//!
//! Cholesky is tried first; a PSD but singular covariance falls back to the
//! eigen decomposition `V sqrt(Λ)`.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::error::{Result, SurveyError};
use crate::synthetic::correlation::CorrelationMatrix;

const EIGEN_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct MultivariateNormal {
    means: DVector<f64>,
    factor: DMatrix<f64>,
}

impl MultivariateNormal {
    pub fn new(means: &[f64], sds: &[f64], correlation: &CorrelationMatrix) -> Result<Self> {
        let p = correlation.dim();
        if means.len() != p || sds.len() != p {
            return Err(SurveyError::config(format!(
                "expected {p} means and sds for a {p}x{p} correlation matrix, got {} and {}",
                means.len(),
                sds.len()
            )));
        }
        if let Some(bad) = means.iter().chain(sds).find(|v| !v.is_finite()) {
            return Err(SurveyError::numeric(format!("non-finite mean/sd {bad}")));
        }
        if let Some(bad) = sds.iter().find(|&&s| s < 0.0) {
            return Err(SurveyError::config(format!("negative standard deviation {bad}")));
        }
        let d = DMatrix::from_diagonal(&DVector::from_column_slice(sds));
        let covariance = &d * correlation.as_matrix() * &d;
        Ok(Self {
            means: DVector::from_column_slice(means),
            factor: decompose(covariance)?,
        })
    }

    pub fn dim(&self) -> usize {
        self.means.len()
    }

    /// `n × p` sample matrix, one draw per row.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> DMatrix<f64> {
        let p = self.dim();
        let z = standard_normals(rng, p, n);
        let mut x = &self.factor * z;
        for mut col in x.column_iter_mut() {
            col += &self.means;
        }
        x.transpose()
    }
}

fn decompose(covariance: DMatrix<f64>) -> Result<DMatrix<f64>> {
    if covariance.iter().any(|v| !v.is_finite()) {
        return Err(SurveyError::numeric("covariance matrix has non-finite entries"));
    }
    // a zero pivot lets cholesky "succeed" with non-finite entries
    if let Some(l) = covariance
        .clone()
        .cholesky()
        .map(|c| c.l())
        .filter(|l| l.iter().all(|v| v.is_finite()))
    {
        return Ok(l);
    }
    debug!("cholesky failed; falling back to eigen decomposition");
    let scale = covariance.diagonal().amax().max(1.0);
    let eig = covariance.symmetric_eigen();
    let min = eig.eigenvalues.min();
    if !(min >= -EIGEN_TOLERANCE * scale) {
        return Err(SurveyError::numeric(format!(
            "covariance matrix is not decomposable (min eigenvalue {min:e})"
        )));
    }
    let roots = eig.eigenvalues.map(|l| l.max(0.0).sqrt());
    Ok(eig.eigenvectors * DMatrix::from_diagonal(&roots))
}

/// `rows × cols` matrix of independent N(0, 1) draws, filled column by column.
pub(crate) fn standard_normals<R: Rng + ?Sized>(rng: &mut R, rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| rng.sample(StandardNormal))
}

/// Draw a new variable with target correlation `targets[j]` to each
/// pre-specified column `predictors[j]`, then scale it to `mean` / `sd`.
///
/// This is the conditional normal `y | X`: with `Z` the standardized
/// predictors and `Rxx` their sample correlation, `b = Rxx⁻¹ r` and
/// `y = Z b + sqrt(1 - rᵀ b) e`.
pub fn conditional_on<R: Rng + ?Sized>(
    rng: &mut R,
    predictors: &[Vec<f64>],
    targets: &[f64],
    mean: f64,
    sd: f64,
) -> Result<Vec<f64>> {
    let k = predictors.len();
    if k == 0 || targets.len() != k {
        return Err(SurveyError::config(format!(
            "need one target correlation per pre-specified column ({k} columns, {} targets)",
            targets.len()
        )));
    }
    if let Some(r) = targets.iter().find(|r| !r.is_finite() || r.abs() > 1.0) {
        return Err(SurveyError::config(format!("target correlation {r} outside [-1, 1]")));
    }
    let n = predictors[0].len();
    if n < 3 || predictors.iter().any(|c| c.len() != n) {
        return Err(SurveyError::numeric(format!(
            "pre-specified columns need equal length >= 3 (got {:?})",
            predictors.iter().map(Vec::len).collect::<Vec<_>>()
        )));
    }

    let mut z = DMatrix::zeros(n, k);
    for (j, col) in predictors.iter().enumerate() {
        let m = col.iter().sum::<f64>() / n as f64;
        let var = col.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (n as f64 - 1.0);
        if !(var > 0.0) {
            return Err(SurveyError::numeric(format!(
                "pre-specified column {j} has zero variance"
            )));
        }
        let s = var.sqrt();
        for (i, v) in col.iter().enumerate() {
            z[(i, j)] = (v - m) / s;
        }
    }
    let rxx = (z.transpose() * &z) / (n as f64 - 1.0);
    let r = DVector::from_column_slice(targets);
    let b = rxx
        .clone()
        .cholesky()
        .map(|c| c.solve(&r))
        .or_else(|| rxx.lu().solve(&r))
        .ok_or_else(|| SurveyError::numeric("pre-specified columns are collinear"))?;
    let residual = 1.0 - r.dot(&b);
    if residual < -EIGEN_TOLERANCE {
        return Err(SurveyError::numeric(format!(
            "target correlations {targets:?} are infeasible for the given columns (residual variance {residual:.4})"
        )));
    }
    let e = standard_normals(rng, n, 1).column(0).into_owned();
    let y = &z * b + e * residual.max(0.0).sqrt();
    Ok(y.iter().map(|v| mean + sd * v).collect())
}
