//! Monte Carlo portfolio trajectory engine
//!
//! This crate turns historical prices for a set of assets into a
//! distribution of future portfolio values. It supports:
//! - Return statistics (mean vector, sample covariance) from aligned price history
//! - Correlated multivariate normal return paths, robust to singular covariance
//! - Block bootstrap resampling of historical returns
//! - Recurring contributions and withdrawals, fees and periodic rebalancing
//! - Inflation-adjusted (real) values next to nominal ones
//! - Percentile bands, terminal statistics, shortfall and depletion probabilities
//!
//! Runs are reproducible: a seed fixes every path bit for bit regardless of
//! how many threads execute them.
//!
//! # Example
//!
//! ```ignore
//! use trajectory_core::{SimulationBuilder, SimulationRequest, simulate};
//!
//! let config = SimulationBuilder::new()
//!     .paths(10_000)
//!     .monthly_steps_for_years(30)
//!     .initial_value(100_000.0)
//!     .weights([0.6, 0.4])
//!     .rebalance_every(12)
//!     .build()?;
//!
//! let request = SimulationRequest::default()
//!     .with_seed(42)
//!     .with_shortfall_threshold(100_000.0);
//! let summary = simulate(&history, &config, &request)?;
//! println!("median: {:?}", summary.terminal_percentile(0.5));
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod aggregate;
pub mod error;
pub mod estimator;
pub mod factorization;
pub mod generator;
pub mod progress;
pub mod provider;
pub mod simulation;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{
    CashFlow, CashFlowAllocation, CashFlowStrategy, InitialValue, ReturnSource,
    SimulationBuilder, SimulationConfig, SimulationRequest,
};
pub use error::{
    DataAlignmentError, InsufficientSampleError, InvalidConfigError, ProviderError,
    SimulationError,
};
pub use generator::{BlockBootstrap, PathGenerator, ReturnSampler, ReturnTensor};
pub use model::{
    Basis, EnsembleSummary, InflationProfile, PathRecord, PriceHistory, PriceSeries, ReturnKind,
    ReturnModel, Trajectory, ValueSummary,
};
pub use progress::SimulationProgress;
pub use provider::{HistoryRequest, PriceHistoryProvider, StaticHistoryProvider};
pub use simulation::{
    run_ensemble, simulate, simulate_from_provider, simulate_with_model,
    simulate_with_model_and_progress, simulate_with_progress,
};
