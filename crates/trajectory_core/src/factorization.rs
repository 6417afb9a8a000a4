//! Symmetric positive-semidefinite factorization.
//!
//! `CovarianceFactor::new` is the only place that decides how a covariance
//! matrix is factored. It returns `L` with `L * L^T ≈ Σ` and never fails for
//! a finite symmetric input:
//!
//! 1. Cholesky, accepted when every pivot is numerically positive;
//! 2. otherwise a symmetric eigen-decomposition `Σ = V Λ V^T`, with negative
//!    or numerically-zero eigenvalues clamped to zero, giving `L = V √Λ`.

use nalgebra::{DMatrix, DVector};

/// Pivots smaller than this fraction of their diagonal entry are treated as
/// zero, so collinear assets take the eigen path instead of producing a
/// Cholesky factor dominated by rounding noise.
const RELATIVE_PIVOT_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorMethod {
    Cholesky,
    Eigen,
}

#[derive(Debug, Clone)]
pub struct CovarianceFactor {
    factor: DMatrix<f64>,
    method: FactorMethod,
}

impl CovarianceFactor {
    #[must_use]
    pub fn new(covariance: &DMatrix<f64>) -> Self {
        if let Some(lower) = cholesky_factor(covariance) {
            return Self {
                factor: lower,
                method: FactorMethod::Cholesky,
            };
        }

        tracing::debug!(
            assets = covariance.nrows(),
            "Covariance not positive definite, using clamped eigen-decomposition"
        );
        Self {
            factor: clamped_eigen_factor(covariance),
            method: FactorMethod::Eigen,
        }
    }

    #[must_use]
    pub fn method(&self) -> FactorMethod {
        self.method
    }

    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.factor
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.factor.nrows()
    }

    /// `L * L^T`, the covariance this factor actually reproduces
    #[must_use]
    pub fn reconstruct(&self) -> DMatrix<f64> {
        &self.factor * self.factor.transpose()
    }

    /// Write `mean + L * z` into `out`
    #[inline]
    pub fn correlate(&self, mean: &DVector<f64>, z: &[f64], out: &mut [f64]) {
        let n = self.dim();
        debug_assert_eq!(z.len(), n);
        debug_assert_eq!(out.len(), n);
        let upper = |i: usize| match self.method {
            FactorMethod::Cholesky => i + 1,
            FactorMethod::Eigen => n,
        };
        for (i, slot) in out.iter_mut().enumerate() {
            let mut acc = mean[i];
            for (k, zk) in z.iter().enumerate().take(upper(i)) {
                acc += self.factor[(i, k)] * zk;
            }
            *slot = acc;
        }
    }
}

fn cholesky_factor(covariance: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let lower = covariance.clone().cholesky()?.l();
    let well_conditioned = (0..lower.nrows()).all(|i| {
        let pivot = lower[(i, i)];
        pivot * pivot > RELATIVE_PIVOT_TOLERANCE * covariance[(i, i)]
    });
    well_conditioned.then_some(lower)
}

fn clamped_eigen_factor(covariance: &DMatrix<f64>) -> DMatrix<f64> {
    let n = covariance.nrows();
    let eigen = covariance.clone().symmetric_eigen();
    let largest = eigen.eigenvalues.iter().copied().fold(0.0_f64, f64::max);
    let floor = largest * n as f64 * f64::EPSILON;
    let roots = eigen
        .eigenvalues
        .map(|lambda| if lambda > floor { lambda.sqrt() } else { 0.0 });

    let mut factor = eigen.eigenvectors;
    for (j, root) in roots.iter().enumerate() {
        factor.column_mut(j).scale_mut(*root);
    }
    factor
}
