//! Inflation profiles and price indices
//!
//! Rates are per simulation step. A sampled profile draws from its own
//! per-path stream, independent of the return stream, so enabling
//! inflation never changes the nominal results of a seeded run.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_distr::{Distribution, LogNormal, Normal};
use serde::{Deserialize, Serialize};

use crate::error::InvalidConfigError;
use crate::generator::derive_path_seed;

/// Mixed into the run seed so inflation draws use a separate stream
const INFLATION_STREAM: u64 = 0xA076_1D64_78BD_642F;

/// Floor for a single sampled step rate
pub const MIN_INFLATION_RATE: f64 = -0.99;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InflationProfile {
    /// Real values equal nominal values
    #[default]
    None,
    Fixed {
        rate: f64,
    },
    Normal {
        mean: f64,
        std_dev: f64,
    },
    /// `exp(N(mean, std_dev)) - 1`
    LogNormal {
        mean: f64,
        std_dev: f64,
    },
}

impl InflationProfile {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, InflationProfile::None)
    }

    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        match *self {
            InflationProfile::None => Ok(()),
            InflationProfile::Fixed { rate } => {
                if !rate.is_finite() || rate <= -1.0 {
                    return Err(InvalidConfigError::InvalidInflation(
                        "fixed rate must be finite and above -100%",
                    ));
                }
                Ok(())
            }
            InflationProfile::Normal { mean, std_dev }
            | InflationProfile::LogNormal { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() || std_dev < 0.0 {
                    return Err(InvalidConfigError::InvalidInflation(
                        "mean must be finite and std_dev finite and non-negative",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Cumulative price level for one path: `index[0] = 1` and
    /// `index[t] = index[t - 1] * (1 + rate_t)`, length `num_steps + 1`
    pub fn price_index(
        &self,
        run_seed: u64,
        path: usize,
        num_steps: usize,
    ) -> Result<Vec<f64>, InvalidConfigError> {
        let mut rng = SmallRng::seed_from_u64(derive_path_seed(run_seed ^ INFLATION_STREAM, path));
        let rates: Vec<f64> = match *self {
            InflationProfile::None => vec![0.0; num_steps],
            InflationProfile::Fixed { rate } => vec![rate; num_steps],
            InflationProfile::Normal { mean, std_dev } => {
                let normal = Normal::new(mean, std_dev).map_err(|_| {
                    InvalidConfigError::InvalidInflation("normal std_dev must be non-negative")
                })?;
                (0..num_steps).map(|_| normal.sample(&mut rng)).collect()
            }
            InflationProfile::LogNormal { mean, std_dev } => {
                let log_normal = LogNormal::new(mean, std_dev).map_err(|_| {
                    InvalidConfigError::InvalidInflation("log-normal std_dev must be non-negative")
                })?;
                (0..num_steps)
                    .map(|_| log_normal.sample(&mut rng) - 1.0)
                    .collect()
            }
        };
        Ok(cumulative_index(&rates))
    }
}

fn cumulative_index(rates: &[f64]) -> Vec<f64> {
    let mut index = Vec::with_capacity(rates.len() + 1);
    let mut level = 1.0;
    index.push(level);
    for &rate in rates {
        level *= 1.0 + rate.max(MIN_INFLATION_RATE);
        index.push(level);
    }
    index
}
