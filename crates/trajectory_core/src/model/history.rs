//! Historical price data and the per-period returns derived from it
//!
//! A `PriceHistory` can only be built from series that share the same dates,
//! so everything downstream may assume every asset has a price for every
//! period.

use jiff::civil::Date;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::DataAlignmentError;

/// Minimum number of prices per series: 3 prices give 2 returns, the least
/// needed for a sample variance.
pub const MIN_PRICE_POINTS: usize = 3;

/// How a pair of consecutive prices is turned into a return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// `p1 / p0 - 1`
    #[default]
    Simple,
    /// `ln(p1 / p0)`
    Log,
}

impl ReturnKind {
    #[inline]
    #[must_use]
    pub fn from_prices(self, previous: f64, current: f64) -> f64 {
        match self {
            ReturnKind::Simple => current / previous - 1.0,
            ReturnKind::Log => (current / previous).ln(),
        }
    }

    /// Multiplicative growth implied by a return of this kind.
    ///
    /// Simple returns below -100% are clamped to a total loss.
    #[inline]
    #[must_use]
    pub fn growth_factor(self, r: f64) -> f64 {
        match self {
            ReturnKind::Simple => (1.0 + r).max(0.0),
            ReturnKind::Log => r.exp(),
        }
    }

    /// Combine several per-period returns into one return of the same kind
    #[must_use]
    pub fn compound(self, returns: impl IntoIterator<Item = f64>) -> f64 {
        match self {
            ReturnKind::Simple => {
                returns
                    .into_iter()
                    .map(|r| self.growth_factor(r))
                    .product::<f64>()
                    - 1.0
            }
            ReturnKind::Log => returns.into_iter().sum(),
        }
    }
}

/// Price history for a single asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub dates: Vec<Date>,
    pub prices: Vec<f64>,
}

impl PriceSeries {
    #[must_use]
    pub fn new(symbol: impl Into<String>, dates: Vec<Date>, prices: Vec<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            dates,
            prices,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Aligned price series for every asset in the portfolio
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceHistory {
    series: Vec<PriceSeries>,
}

impl PriceHistory {
    /// Validate and wrap a set of price series.
    ///
    /// All series must have the same dates (strictly increasing), at least
    /// `MIN_PRICE_POINTS` prices, and no missing or non-positive prices.
    pub fn new(series: Vec<PriceSeries>) -> Result<Self, DataAlignmentError> {
        let first = series.first().ok_or(DataAlignmentError::NoAssets)?;
        let expected = first.len();
        let reference_dates = &first.dates;

        let mut seen = FxHashSet::default();
        for s in &series {
            if !seen.insert(s.symbol.as_str()) {
                return Err(DataAlignmentError::DuplicateSymbol(s.symbol.clone()));
            }
            if s.dates.len() != s.prices.len() {
                return Err(DataAlignmentError::LengthMismatch {
                    symbol: s.symbol.clone(),
                    expected: s.dates.len(),
                    found: s.prices.len(),
                });
            }
            if s.len() != expected {
                return Err(DataAlignmentError::LengthMismatch {
                    symbol: s.symbol.clone(),
                    expected,
                    found: s.len(),
                });
            }
            if s.len() < MIN_PRICE_POINTS {
                return Err(DataAlignmentError::TooShort {
                    symbol: s.symbol.clone(),
                    len: s.len(),
                    min: MIN_PRICE_POINTS,
                });
            }
            for (index, (date, reference)) in s.dates.iter().zip(reference_dates).enumerate() {
                if date != reference {
                    return Err(DataAlignmentError::DateMismatch {
                        symbol: s.symbol.clone(),
                        index,
                    });
                }
                if index > 0 && s.dates[index - 1] >= *date {
                    return Err(DataAlignmentError::UnorderedDates {
                        symbol: s.symbol.clone(),
                        index,
                    });
                }
            }
            for (index, &price) in s.prices.iter().enumerate() {
                if !price.is_finite() {
                    return Err(DataAlignmentError::MissingPrice {
                        symbol: s.symbol.clone(),
                        index,
                    });
                }
                if price <= 0.0 {
                    return Err(DataAlignmentError::NonPositivePrice {
                        symbol: s.symbol.clone(),
                        index,
                        price,
                    });
                }
            }
        }

        Ok(Self { series })
    }

    #[must_use]
    pub fn series(&self) -> &[PriceSeries] {
        &self.series
    }

    #[must_use]
    pub fn num_assets(&self) -> usize {
        self.series.len()
    }

    /// Number of price observations per asset
    #[must_use]
    pub fn num_periods(&self) -> usize {
        self.series[0].len()
    }

    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.series[0].dates
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.symbol.as_str())
    }

    /// Per-period returns for every asset, in series order
    #[must_use]
    pub fn returns(&self, kind: ReturnKind) -> Vec<AssetReturnSeries> {
        self.series
            .iter()
            .map(|s| AssetReturnSeries {
                symbol: s.symbol.clone(),
                returns: s
                    .prices
                    .windows(2)
                    .map(|w| kind.from_prices(w[0], w[1]))
                    .collect(),
            })
            .collect()
    }

    /// Returns laid out as `rows[period][asset]`, the shape the bootstrap
    /// sampler draws whole periods from.
    #[must_use]
    pub fn return_rows(&self, kind: ReturnKind) -> Vec<Vec<f64>> {
        let per_asset = self.returns(kind);
        let periods = self.num_periods() - 1;
        (0..periods)
            .map(|t| per_asset.iter().map(|a| a.returns[t]).collect())
            .collect()
    }
}

/// Per-period returns for one asset; always at least two periods long
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetReturnSeries {
    pub symbol: String,
    pub returns: Vec<f64>,
}

impl AssetReturnSeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        self.returns.iter().sum::<f64>() / self.returns.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    fn dates(n: usize) -> Vec<Date> {
        (0..n)
            .map(|i| date(2020, 1, 1).saturating_add(jiff::Span::new().months(i as i64)))
            .collect()
    }

    #[test]
    fn test_history_accepts_aligned_series() {
        let history = PriceHistory::new(vec![
            PriceSeries::new("AAA", dates(4), vec![100.0, 110.0, 121.0, 133.1]),
            PriceSeries::new("BBB", dates(4), vec![50.0, 50.0, 55.0, 55.0]),
        ])
        .unwrap();

        assert_eq!(history.num_assets(), 2);
        assert_eq!(history.num_periods(), 4);
        assert_eq!(history.symbols().collect::<Vec<_>>(), vec!["AAA", "BBB"]);
    }

    #[test]
    fn test_history_rejects_length_mismatch() {
        let err = PriceHistory::new(vec![
            PriceSeries::new("AAA", dates(4), vec![1.0, 2.0, 3.0, 4.0]),
            PriceSeries::new("BBB", dates(3), vec![1.0, 2.0, 3.0]),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            DataAlignmentError::LengthMismatch {
                symbol: "BBB".into(),
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn test_history_rejects_shifted_dates() {
        let mut shifted = dates(4);
        shifted[2] = date(2020, 3, 15);
        let err = PriceHistory::new(vec![
            PriceSeries::new("AAA", dates(4), vec![1.0, 2.0, 3.0, 4.0]),
            PriceSeries::new("BBB", shifted, vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            DataAlignmentError::DateMismatch {
                symbol: "BBB".into(),
                index: 2
            }
        );
    }

    #[test]
    fn test_history_rejects_gaps_and_short_series() {
        let err = PriceHistory::new(vec![PriceSeries::new(
            "AAA",
            dates(3),
            vec![1.0, f64::NAN, 3.0],
        )])
        .unwrap_err();
        assert!(matches!(err, DataAlignmentError::MissingPrice { index: 1, .. }));

        let err =
            PriceHistory::new(vec![PriceSeries::new("AAA", dates(2), vec![1.0, 2.0])]).unwrap_err();
        assert!(matches!(err, DataAlignmentError::TooShort { len: 2, .. }));

        let err = PriceHistory::new(vec![]).unwrap_err();
        assert_eq!(err, DataAlignmentError::NoAssets);
    }

    #[test]
    fn test_history_rejects_duplicate_symbols_and_unordered_dates() {
        let err = PriceHistory::new(vec![
            PriceSeries::new("AAA", dates(3), vec![1.0, 2.0, 3.0]),
            PriceSeries::new("AAA", dates(3), vec![1.0, 2.0, 3.0]),
        ])
        .unwrap_err();
        assert_eq!(err, DataAlignmentError::DuplicateSymbol("AAA".into()));

        let mut backwards = dates(3);
        backwards.swap(1, 2);
        let err = PriceHistory::new(vec![PriceSeries::new("AAA", backwards, vec![1.0, 2.0, 3.0])])
            .unwrap_err();
        assert!(matches!(err, DataAlignmentError::UnorderedDates { index: 2, .. }));
    }

    #[test]
    fn test_simple_and_log_returns() {
        let history = PriceHistory::new(vec![PriceSeries::new(
            "AAA",
            dates(3),
            vec![100.0, 110.0, 99.0],
        )])
        .unwrap();

        let simple = &history.returns(ReturnKind::Simple)[0];
        assert!((simple.returns[0] - 0.10).abs() < 1e-12);
        assert!((simple.returns[1] + 0.10).abs() < 1e-12);

        let log = &history.returns(ReturnKind::Log)[0];
        assert!((log.returns[0] - 1.1_f64.ln()).abs() < 1e-12);
        assert!((log.returns[1] - 0.9_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_compound_and_growth_factor() {
        let simple = ReturnKind::Simple.compound([0.10, 0.10]);
        assert!((simple - 0.21).abs() < 1e-12);
        assert_eq!(ReturnKind::Simple.growth_factor(-1.5), 0.0);

        let log = ReturnKind::Log.compound([0.05, 0.05]);
        assert!((log - 0.10).abs() < 1e-12);
        assert!((ReturnKind::Log.growth_factor(0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_return_rows_layout() {
        let history = PriceHistory::new(vec![
            PriceSeries::new("AAA", dates(3), vec![1.0, 2.0, 4.0]),
            PriceSeries::new("BBB", dates(3), vec![1.0, 1.0, 0.5]),
        ])
        .unwrap();
        let rows = history.return_rows(ReturnKind::Simple);
        assert_eq!(rows, vec![vec![1.0, 0.0], vec![1.0, -0.5]]);
    }
}
