use nalgebra::{DMatrix, DVector};

use crate::error::InvalidConfigError;
use crate::model::ReturnKind;

const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Per-period mean vector and covariance matrix across assets.
///
/// The covariance may be singular (collinear or zero-variance assets); the
/// path generator handles that through `CovarianceFactor`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnModel {
    symbols: Vec<String>,
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    kind: ReturnKind,
}

impl ReturnModel {
    /// Build a model from explicit parameters, checking its invariants.
    pub fn from_parameters(
        symbols: Vec<String>,
        mean: Vec<f64>,
        covariance: Vec<Vec<f64>>,
        kind: ReturnKind,
    ) -> Result<Self, InvalidConfigError> {
        let n = mean.len();
        if n == 0 {
            return Err(InvalidConfigError::InvalidModel("mean vector is empty"));
        }
        if covariance.len() != n || covariance.iter().any(|row| row.len() != n) {
            return Err(InvalidConfigError::InvalidModel(
                "covariance dimension must equal asset count",
            ));
        }
        let covariance = DMatrix::from_fn(n, n, |i, j| covariance[i][j]);
        Self::new(symbols, DVector::from_vec(mean), covariance, kind)
    }

    pub(crate) fn new(
        symbols: Vec<String>,
        mean: DVector<f64>,
        covariance: DMatrix<f64>,
        kind: ReturnKind,
    ) -> Result<Self, InvalidConfigError> {
        let n = mean.len();
        if symbols.len() != n {
            return Err(InvalidConfigError::InvalidModel(
                "one symbol required per asset",
            ));
        }
        if covariance.nrows() != n || covariance.ncols() != n {
            return Err(InvalidConfigError::InvalidModel(
                "covariance dimension must equal asset count",
            ));
        }
        if mean.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
            return Err(InvalidConfigError::NonFinite("return model"));
        }
        for i in 0..n {
            if covariance[(i, i)] < 0.0 {
                return Err(InvalidConfigError::InvalidModel(
                    "covariance diagonal must be non-negative",
                ));
            }
            for j in (i + 1)..n {
                let (a, b) = (covariance[(i, j)], covariance[(j, i)]);
                let scale = a.abs().max(b.abs()).max(1.0);
                if (a - b).abs() > SYMMETRY_TOLERANCE * scale {
                    return Err(InvalidConfigError::InvalidModel(
                        "covariance must be symmetric",
                    ));
                }
            }
        }

        Ok(Self {
            symbols,
            mean,
            covariance,
            kind,
        })
    }

    #[must_use]
    pub fn num_assets(&self) -> usize {
        self.mean.len()
    }

    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    #[must_use]
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    #[must_use]
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    #[must_use]
    pub fn kind(&self) -> ReturnKind {
        self.kind
    }

    /// Per-asset standard deviations (square roots of the diagonal)
    #[must_use]
    pub fn std_devs(&self) -> Vec<f64> {
        self.covariance.diagonal().iter().map(|v| v.sqrt()).collect()
    }

    /// Model for a step spanning `periods` history periods.
    ///
    /// Returns are treated as i.i.d. across periods, so mean and covariance
    /// both scale linearly. This is exact for log returns and a first-order
    /// approximation for simple returns.
    #[must_use]
    pub fn scaled(&self, periods: u32) -> Self {
        let k = f64::from(periods);
        Self {
            symbols: self.symbols.clone(),
            mean: &self.mean * k,
            covariance: &self.covariance * k,
            kind: self.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("A{i}")).collect()
    }

    #[test]
    fn test_from_parameters_valid() {
        let model = ReturnModel::from_parameters(
            symbols(2),
            vec![0.01, 0.02],
            vec![vec![0.04, 0.01], vec![0.01, 0.09]],
            ReturnKind::Simple,
        )
        .unwrap();

        assert_eq!(model.num_assets(), 2);
        let sd = model.std_devs();
        assert!((sd[0] - 0.2).abs() < 1e-12);
        assert!((sd[1] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_from_parameters_rejects_bad_shapes() {
        assert!(
            ReturnModel::from_parameters(
                symbols(2),
                vec![0.0, 0.0],
                vec![vec![1.0]],
                ReturnKind::Simple,
            )
            .is_err()
        );
        assert!(
            ReturnModel::from_parameters(
                symbols(2),
                vec![0.0, 0.0],
                vec![vec![1.0, 0.5], vec![0.2, 1.0]],
                ReturnKind::Simple,
            )
            .is_err()
        );
        assert!(
            ReturnModel::from_parameters(
                symbols(1),
                vec![0.0],
                vec![vec![-0.1]],
                ReturnKind::Simple,
            )
            .is_err()
        );
        assert!(
            ReturnModel::from_parameters(
                symbols(1),
                vec![f64::NAN],
                vec![vec![0.1]],
                ReturnKind::Log,
            )
            .is_err()
        );
    }

    #[test]
    fn test_scaled_model() {
        let model = ReturnModel::from_parameters(
            symbols(1),
            vec![0.01],
            vec![vec![0.0004]],
            ReturnKind::Log,
        )
        .unwrap();
        let yearly = model.scaled(12);
        assert!((yearly.mean()[0] - 0.12).abs() < 1e-12);
        assert!((yearly.covariance()[(0, 0)] - 0.0048).abs() < 1e-12);
    }
}
