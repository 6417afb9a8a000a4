//! Price history files
//!
//! All assets share one date column:
//!
//! ```yaml
//! dates: [2024-01-31, 2024-02-29, 2024-03-31]
//! assets:
//!   - symbol: STOCK
//!     prices: [100.0, 103.2, 101.7]
//!   - symbol: BOND
//!     prices: [50.0, 50.1, 50.3]
//! ```

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use trajectory_core::model::{PriceHistory, PriceSeries};
use trajectory_core::provider::StaticHistoryProvider;

use crate::scenario::FileFormat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPrices {
    pub symbol: String,
    pub prices: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryFile {
    pub dates: Vec<Date>,
    pub assets: Vec<AssetPrices>,
}

impl HistoryFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read price history {}", path.display()))?;
        FileFormat::from_path(path)
            .parse(&content)
            .wrap_err_with(|| format!("Failed to parse price history {}", path.display()))
    }

    /// Validate alignment and build the in-memory history
    pub fn into_history(self) -> Result<PriceHistory> {
        let series = self
            .assets
            .into_iter()
            .map(|asset| PriceSeries::new(asset.symbol, self.dates.clone(), asset.prices))
            .collect();
        Ok(PriceHistory::new(series)?)
    }

    pub fn into_provider(self) -> Result<StaticHistoryProvider> {
        let history = self.into_history()?;
        tracing::debug!(
            assets = history.num_assets(),
            prices = history.num_periods(),
            "Loaded price history"
        );
        Ok(StaticHistoryProvider::new(history))
    }
}
