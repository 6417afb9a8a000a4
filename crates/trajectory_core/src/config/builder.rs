//! Simulation Builder
//!
//! Fluent construction of a [`SimulationConfig`] with validation at the end.
//!
//! # Example
//!
//! ```ignore
//! use trajectory_core::config::{CashFlow, SimulationBuilder};
//!
//! let config = SimulationBuilder::new()
//!     .paths(5_000)
//!     .monthly_steps_for_years(30)
//!     .initial_value(250_000.0)
//!     .weights([0.6, 0.4])
//!     .cash_flow(CashFlow::contribution(1_000.0, 1).ending_at(120))
//!     .cash_flow(CashFlow::withdrawal(4_000.0, 1).starting_at(121))
//!     .rebalance_every(12)
//!     .fee_rate(0.0005)
//!     .build()?;
//! ```

use super::{
    CashFlow, CashFlowAllocation, CashFlowStrategy, InitialValue, ReturnSource, SimulationConfig,
};
use crate::error::InvalidConfigError;
use crate::model::{InflationProfile, ReturnKind};

/// Builder for [`SimulationConfig`]
#[derive(Debug, Clone, Default)]
pub struct SimulationBuilder {
    config: SimulationConfig,
}

impl SimulationBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Horizon
    // =========================================================================

    #[must_use]
    pub fn paths(mut self, num_paths: usize) -> Self {
        self.config.num_paths = num_paths;
        self
    }

    #[must_use]
    pub fn steps(mut self, num_steps: usize) -> Self {
        self.config.num_steps = num_steps;
        self
    }

    /// `years * 12` steps of one period each
    #[must_use]
    pub fn monthly_steps_for_years(mut self, years: usize) -> Self {
        self.config.num_steps = years * 12;
        self
    }

    /// Number of history periods folded into each step
    #[must_use]
    pub fn step_length(mut self, periods: u32) -> Self {
        self.config.step_length = periods;
        self
    }

    // =========================================================================
    // Portfolio
    // =========================================================================

    #[must_use]
    pub fn initial_value(mut self, value: f64) -> Self {
        self.config.initial_value = InitialValue::Single(value);
        self
    }

    #[must_use]
    pub fn initial_values(mut self, values: Vec<f64>) -> Self {
        self.config.initial_value = InitialValue::PerPath(values);
        self
    }

    #[must_use]
    pub fn weights(mut self, weights: impl Into<Vec<f64>>) -> Self {
        self.config.weights = weights.into();
        self
    }

    /// Equal weight across `num_assets` assets
    #[must_use]
    pub fn equal_weights(mut self, num_assets: usize) -> Self {
        self.config.weights = vec![1.0 / num_assets as f64; num_assets];
        self
    }

    // =========================================================================
    // Cash flows and rebalancing
    // =========================================================================

    #[must_use]
    pub fn cash_flow(mut self, flow: CashFlow) -> Self {
        self.config.cash_flows.push(flow);
        self
    }

    /// Append the flows of a preset strategy
    #[must_use]
    pub fn cash_flow_strategy(mut self, strategy: CashFlowStrategy) -> Self {
        self.config.cash_flows.extend(strategy.into_flows());
        self
    }

    #[must_use]
    pub fn allocate_cash_flows(mut self, allocation: CashFlowAllocation) -> Self {
        self.config.cash_flow_allocation = allocation;
        self
    }

    #[must_use]
    pub fn rebalance_every(mut self, steps: usize) -> Self {
        self.config.rebalance_every = Some(steps);
        self
    }

    #[must_use]
    pub fn fee_rate(mut self, rate: f64) -> Self {
        self.config.fee_rate = rate;
        self
    }

    // =========================================================================
    // Return model
    // =========================================================================

    #[must_use]
    pub fn return_kind(mut self, kind: ReturnKind) -> Self {
        self.config.return_kind = kind;
        self
    }

    #[must_use]
    pub fn bootstrap(mut self, block_size: usize, circular: bool) -> Self {
        self.config.return_source = ReturnSource::Bootstrap {
            block_size,
            circular,
        };
        self
    }

    #[must_use]
    pub fn inflation(mut self, profile: InflationProfile) -> Self {
        self.config.inflation = profile;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<SimulationConfig, InvalidConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
