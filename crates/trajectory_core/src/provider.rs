//! Price history sources
//!
//! The engine never performs I/O; callers hand it a `PriceHistory` directly
//! or through a `PriceHistoryProvider`.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::model::{PriceHistory, PriceSeries};

/// Which assets and dates to fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Symbols in the order the simulation expects them; empty means every
    /// symbol the provider has
    #[serde(default)]
    pub symbols: Vec<String>,
    /// First date to include
    #[serde(default)]
    pub start: Option<Date>,
    /// Last date to include
    #[serde(default)]
    pub end: Option<Date>,
}

impl HistoryRequest {
    #[must_use]
    pub fn new(symbols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            start: None,
            end: None,
        }
    }

    #[must_use]
    pub fn between(mut self, start: Option<Date>, end: Option<Date>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    #[inline]
    fn contains(&self, date: Date) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

pub trait PriceHistoryProvider {
    fn fetch(&self, request: &HistoryRequest) -> Result<PriceHistory, ProviderError>;
}

/// Serves requests from a history already in memory
#[derive(Debug, Clone)]
pub struct StaticHistoryProvider {
    history: PriceHistory,
}

impl StaticHistoryProvider {
    #[must_use]
    pub fn new(history: PriceHistory) -> Self {
        Self { history }
    }

    #[must_use]
    pub fn history(&self) -> &PriceHistory {
        &self.history
    }
}

impl PriceHistoryProvider for StaticHistoryProvider {
    fn fetch(&self, request: &HistoryRequest) -> Result<PriceHistory, ProviderError> {
        let selected: Vec<&PriceSeries> = if request.symbols.is_empty() {
            self.history.series().iter().collect()
        } else {
            request
                .symbols
                .iter()
                .map(|symbol| {
                    self.history
                        .series()
                        .iter()
                        .find(|s| &s.symbol == symbol)
                        .ok_or_else(|| ProviderError::Unavailable {
                            symbol: symbol.clone(),
                            reason: "symbol not in history".to_string(),
                        })
                })
                .collect::<Result<_, _>>()?
        };

        let series = selected
            .into_iter()
            .map(|s| {
                let (dates, prices): (Vec<Date>, Vec<f64>) = s
                    .dates
                    .iter()
                    .zip(&s.prices)
                    .filter(|(date, _)| request.contains(**date))
                    .map(|(date, price)| (*date, *price))
                    .unzip();
                PriceSeries::new(s.symbol.clone(), dates, prices)
            })
            .collect();

        Ok(PriceHistory::new(series)?)
    }
}
