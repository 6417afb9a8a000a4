//! Calibration of a `ReturnModel` from historical prices.
//!
//! Uses the sample covariance (denominator `n - 1`) throughout. Assets with
//! constant prices produce zero rows/columns; the resulting singular matrix
//! is left for `CovarianceFactor` to handle.

use nalgebra::{DMatrix, DVector};

use crate::error::InvalidConfigError;
use crate::model::{AssetReturnSeries, PriceHistory, ReturnKind, ReturnModel};

/// Estimate mean vector and sample covariance of per-period returns
pub fn estimate(
    history: &PriceHistory,
    kind: ReturnKind,
) -> Result<ReturnModel, InvalidConfigError> {
    let returns = history.returns(kind);
    let model = estimate_from_returns(&returns, kind)?;
    tracing::debug!(
        assets = model.num_assets(),
        periods = returns[0].len(),
        ?kind,
        "Estimated return model"
    );
    Ok(model)
}

/// Estimate a model from already-computed return series of equal length
pub fn estimate_from_returns(
    returns: &[AssetReturnSeries],
    kind: ReturnKind,
) -> Result<ReturnModel, InvalidConfigError> {
    let n_assets = returns.len();
    let n_periods = returns.first().map_or(0, AssetReturnSeries::len);
    if n_assets == 0 {
        return Err(InvalidConfigError::InvalidModel("no return series"));
    }
    if n_periods < 2 {
        return Err(InvalidConfigError::InvalidModel(
            "at least two return periods required",
        ));
    }
    if returns.iter().any(|r| r.len() != n_periods) {
        return Err(InvalidConfigError::InvalidModel(
            "return series lengths differ",
        ));
    }

    let mean = DVector::from_iterator(n_assets, returns.iter().map(AssetReturnSeries::mean));
    let denom = (n_periods - 1) as f64;
    let covariance = DMatrix::from_fn(n_assets, n_assets, |i, j| {
        let (mi, mj) = (mean[i], mean[j]);
        returns[i]
            .returns
            .iter()
            .zip(&returns[j].returns)
            .map(|(a, b)| (a - mi) * (b - mj))
            .sum::<f64>()
            / denom
    });

    ReturnModel::new(
        returns.iter().map(|r| r.symbol.clone()).collect(),
        mean,
        covariance,
        kind,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PriceSeries;
    use jiff::civil::{Date, date};

    fn dates(n: usize) -> Vec<Date> {
        (0..n)
            .map(|i| date(2000, 1, 1).saturating_add(jiff::Span::new().days(i as i64)))
            .collect()
    }

    fn series(symbol: &str, returns: &[f64]) -> AssetReturnSeries {
        AssetReturnSeries {
            symbol: symbol.to_string(),
            returns: returns.to_vec(),
        }
    }

    #[test]
    fn test_sample_mean_and_covariance() {
        let returns = [series("A", &[0.01, 0.03, 0.02]), series("B", &[0.02, 0.06, 0.04])];
        let model = estimate_from_returns(&returns, ReturnKind::Simple).unwrap();

        assert!((model.mean()[0] - 0.02).abs() < 1e-12);
        assert!((model.mean()[1] - 0.04).abs() < 1e-12);
        // var(A) = (1e-4 + 1e-4 + 0) / 2
        let cov = model.covariance();
        assert!((cov[(0, 0)] - 1e-4).abs() < 1e-15);
        assert!((cov[(1, 1)] - 4e-4).abs() < 1e-15);
        assert!((cov[(0, 1)] - 2e-4).abs() < 1e-15);
        assert_eq!(cov[(0, 1)], cov[(1, 0)]);
    }

    #[test]
    fn test_single_asset_is_valid() {
        let history = PriceHistory::new(vec![PriceSeries::new(
            "ONLY",
            dates(4),
            vec![100.0, 102.0, 101.0, 104.0],
        )])
        .unwrap();
        let model = estimate(&history, ReturnKind::Log).unwrap();

        assert_eq!(model.num_assets(), 1);
        assert_eq!(model.kind(), ReturnKind::Log);
        assert!(model.covariance()[(0, 0)] > 0.0);
        assert_eq!(model.symbols(), ["ONLY".to_string()]);
    }

    #[test]
    fn test_zero_variance_asset_gives_singular_covariance() {
        let history = PriceHistory::new(vec![
            PriceSeries::new("FLAT", dates(4), vec![10.0, 10.0, 10.0, 10.0]),
            PriceSeries::new("MOVE", dates(4), vec![10.0, 11.0, 10.5, 12.0]),
        ])
        .unwrap();
        let model = estimate(&history, ReturnKind::Simple).unwrap();

        let cov = model.covariance();
        assert_eq!(cov[(0, 0)], 0.0);
        assert_eq!(cov[(0, 1)], 0.0);
        assert!(cov[(1, 1)] > 0.0);
        assert!(cov.determinant().abs() < 1e-18);
    }

    #[test]
    fn test_too_few_periods() {
        let returns = [series("A", &[0.01])];
        assert!(estimate_from_returns(&returns, ReturnKind::Simple).is_err());
    }
}
