//! Integration tests for the trajectory engine
//!
//! Tests are organized by topic:
//! - `scenarios` - End-to-end runs with known outcomes
//! - `determinism` - Seeded reproducibility and thread independence
//! - `cash_flows` - Contributions, withdrawals and depletion
//! - `correlation` - Correlated and degenerate covariance
//! - `properties` - Randomized properties of the aggregator and simulator

mod determinism;

use jiff::Span;
use jiff::civil::{Date, date};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::model::{PriceHistory, PriceSeries};

pub(crate) fn daily_dates(n: usize) -> Vec<Date> {
    (0..n)
        .map(|i| date(2020, 1, 1).saturating_add(Span::new().days(i as i64)))
        .collect()
}

/// Aligned history from `(symbol, prices)` pairs
pub(crate) fn history(assets: &[(&str, Vec<f64>)]) -> PriceHistory {
    let n = assets[0].1.len();
    PriceHistory::new(
        assets
            .iter()
            .map(|(symbol, prices)| PriceSeries::new(*symbol, daily_dates(n), prices.clone()))
            .collect(),
    )
    .unwrap()
}

/// Geometric random walk with uniform shocks in `[-vol, vol]`
pub(crate) fn random_walk(seed: u64, n: usize, drift: f64, vol: f64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut price = 100.0;
    let mut prices = Vec::with_capacity(n);
    for _ in 0..n {
        prices.push(price);
        price *= 1.0 + drift + rng.random_range(-vol..=vol);
    }
    prices
}
