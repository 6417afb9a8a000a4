//! Simulation configuration
//!
//! `SimulationConfig` holds everything needed to turn a return model into an
//! ensemble of trajectories. It is plain data: construct it directly, through
//! serde, or with [`SimulationBuilder`], then call
//! [`SimulationConfig::validate`] (the engine does this before sampling).
//!
//! # Step semantics
//!
//! Each step `t = 1..=num_steps` applies, in this fixed order:
//!
//! 1. per-asset returns,
//! 2. the fee (`fee_rate` of every sub-balance),
//! 3. every cash flow due at `t`,
//! 4. rebalancing to `weights` when `rebalance_every` divides `t`.
//!
//! Real values divide each nominal value by the path's price index, built
//! from `inflation` at one rate per step.

use serde::{Deserialize, Serialize};

use crate::error::{DataAlignmentError, InvalidConfigError, SimulationError};
use crate::model::{InflationProfile, ReturnKind};

pub mod builder;

pub use builder::SimulationBuilder;

/// Upper bound on paths per run
pub const MAX_PATHS: usize = 1_000_000;
/// Upper bound on steps per run (100 years of monthly steps)
pub const MAX_STEPS: usize = 1_200;
/// Allowed deviation of the weight sum from 1
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

fn default_num_paths() -> usize {
    1_000
}

fn default_num_steps() -> usize {
    360
}

fn default_step_length() -> u32 {
    1
}

fn default_start_step() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Starting portfolio value, shared by every path or given per path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitialValue {
    Single(f64),
    PerPath(Vec<f64>),
}

impl Default for InitialValue {
    fn default() -> Self {
        InitialValue::Single(10_000.0)
    }
}

impl InitialValue {
    /// Initial value for a path; `PerPath` lengths are checked by `validate`
    #[must_use]
    pub fn for_path(&self, path: usize) -> f64 {
        match self {
            InitialValue::Single(v) => *v,
            InitialValue::PerPath(values) => values[path],
        }
    }
}

/// A recurring contribution (positive amount) or withdrawal (negative amount)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub amount: f64,
    /// Frequency in steps
    pub every: usize,
    /// First step the flow applies to
    #[serde(default = "default_start_step")]
    pub start_step: usize,
    /// Last step the flow may apply to (inclusive)
    #[serde(default)]
    pub end_step: Option<usize>,
}

impl CashFlow {
    #[must_use]
    pub fn contribution(amount: f64, every: usize) -> Self {
        Self {
            amount: amount.abs(),
            every,
            start_step: 1,
            end_step: None,
        }
    }

    #[must_use]
    pub fn withdrawal(amount: f64, every: usize) -> Self {
        Self {
            amount: -amount.abs(),
            every,
            start_step: 1,
            end_step: None,
        }
    }

    #[must_use]
    pub fn starting_at(mut self, step: usize) -> Self {
        self.start_step = step;
        self
    }

    #[must_use]
    pub fn ending_at(mut self, step: usize) -> Self {
        self.end_step = Some(step);
        self
    }

    /// Whether the flow applies at step `t` (1-based)
    #[inline]
    #[must_use]
    pub fn is_due(&self, t: usize) -> bool {
        t >= self.start_step
            && self.end_step.is_none_or(|end| t <= end)
            && (t - self.start_step) % self.every == 0
    }

    fn validate(&self) -> Result<(), InvalidConfigError> {
        if !self.amount.is_finite() {
            return Err(InvalidConfigError::NonFinite("cash flow amount"));
        }
        if self.every == 0 {
            return Err(InvalidConfigError::ZeroFrequency("cash flow"));
        }
        if self.start_step == 0 {
            return Err(InvalidConfigError::InvalidCashFlowWindow {
                start_step: self.start_step,
                end_step: self.end_step.unwrap_or(0),
            });
        }
        if let Some(end) = self.end_step
            && end < self.start_step
        {
            return Err(InvalidConfigError::InvalidCashFlowWindow {
                start_step: self.start_step,
                end_step: end,
            });
        }
        Ok(())
    }
}

/// Preset cash-flow plans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CashFlowStrategy {
    /// No contributions or withdrawals
    Zero,
    /// A single fixed recurring flow; negative amounts withdraw
    Fixed { amount: f64, every: usize },
    /// Contribute until retirement, then withdraw for the rest of the horizon
    Lifecycle {
        contribution: f64,
        withdrawal: f64,
        /// Number of steps until retirement; the first withdrawal happens at
        /// `retirement_step + 1`
        retirement_step: usize,
        every: usize,
    },
}

impl CashFlowStrategy {
    /// Expand the strategy into explicit cash flows
    #[must_use]
    pub fn into_flows(self) -> Vec<CashFlow> {
        match self {
            CashFlowStrategy::Zero => Vec::new(),
            CashFlowStrategy::Fixed { amount, every } => vec![CashFlow {
                amount,
                every,
                start_step: 1,
                end_step: None,
            }],
            CashFlowStrategy::Lifecycle {
                contribution,
                withdrawal,
                retirement_step,
                every,
            } => {
                let mut flows = Vec::with_capacity(2);
                if retirement_step > 0 {
                    flows.push(
                        CashFlow::contribution(contribution, every).ending_at(retirement_step),
                    );
                }
                flows.push(
                    CashFlow::withdrawal(withdrawal, every).starting_at(retirement_step + 1),
                );
                flows
            }
        }
    }
}

/// How cash flows are spread across assets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum CashFlowAllocation {
    /// In proportion to current sub-balances (target weights when empty)
    #[default]
    ProRata,
    /// Contributions go to one asset; withdrawals drain it first and take
    /// any remainder pro rata from the rest
    Asset { index: usize },
}

/// Where per-step asset returns come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReturnSource {
    /// Multivariate normal draws from the estimated mean and covariance
    #[default]
    Statistical,
    /// Resample contiguous blocks of historical periods
    Bootstrap {
        #[serde(default = "default_block_size")]
        block_size: usize,
        #[serde(default = "default_true")]
        circular: bool,
    },
}

fn default_block_size() -> usize {
    1
}

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_num_paths")]
    pub num_paths: usize,

    #[serde(default = "default_num_steps")]
    pub num_steps: usize,

    /// History periods per simulation step
    #[serde(default = "default_step_length")]
    pub step_length: u32,

    #[serde(default)]
    pub initial_value: InitialValue,

    /// Target allocation, one weight per asset in history order
    pub weights: Vec<f64>,

    #[serde(default)]
    pub cash_flows: Vec<CashFlow>,

    #[serde(default)]
    pub cash_flow_allocation: CashFlowAllocation,

    /// Rebalance to `weights` every this many steps; never when `None`
    #[serde(default)]
    pub rebalance_every: Option<usize>,

    /// Fraction of value deducted every step
    #[serde(default)]
    pub fee_rate: f64,

    #[serde(default)]
    pub return_kind: ReturnKind,

    #[serde(default)]
    pub return_source: ReturnSource,

    #[serde(default)]
    pub inflation: InflationProfile,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_paths: default_num_paths(),
            num_steps: default_num_steps(),
            step_length: default_step_length(),
            initial_value: InitialValue::default(),
            weights: vec![1.0],
            cash_flows: Vec::new(),
            cash_flow_allocation: CashFlowAllocation::default(),
            rebalance_every: None,
            fee_rate: 0.0,
            return_kind: ReturnKind::default(),
            return_source: ReturnSource::default(),
            inflation: InflationProfile::default(),
        }
    }
}

impl SimulationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn num_assets(&self) -> usize {
        self.weights.len()
    }

    /// Check every invariant that does not depend on the market data
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        if self.num_paths == 0 {
            return Err(InvalidConfigError::ZeroPaths);
        }
        if self.num_paths > MAX_PATHS {
            return Err(InvalidConfigError::TooManyPaths {
                requested: self.num_paths,
                max: MAX_PATHS,
            });
        }
        if self.num_steps == 0 {
            return Err(InvalidConfigError::ZeroSteps);
        }
        if self.num_steps > MAX_STEPS {
            return Err(InvalidConfigError::TooManySteps {
                requested: self.num_steps,
                max: MAX_STEPS,
            });
        }
        if self.step_length == 0 {
            return Err(InvalidConfigError::ZeroStepLength);
        }

        if self.weights.is_empty() {
            return Err(InvalidConfigError::NoWeights);
        }
        for (index, &weight) in self.weights.iter().enumerate() {
            if !weight.is_finite() {
                return Err(InvalidConfigError::NonFinite("weight"));
            }
            if weight < 0.0 {
                return Err(InvalidConfigError::NegativeWeight { index, weight });
            }
        }
        let sum: f64 = self.weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(InvalidConfigError::WeightsDoNotSumToOne { sum });
        }

        match &self.initial_value {
            InitialValue::Single(v) => check_initial_value(*v)?,
            InitialValue::PerPath(values) => {
                if values.len() != self.num_paths {
                    return Err(InvalidConfigError::InitialValueCountMismatch {
                        paths: self.num_paths,
                        values: values.len(),
                    });
                }
                for &v in values {
                    check_initial_value(v)?;
                }
            }
        }

        for flow in &self.cash_flows {
            flow.validate()?;
        }
        if let CashFlowAllocation::Asset { index } = self.cash_flow_allocation
            && index >= self.weights.len()
        {
            return Err(InvalidConfigError::AllocationAssetOutOfRange {
                index,
                assets: self.weights.len(),
            });
        }
        if self.rebalance_every == Some(0) {
            return Err(InvalidConfigError::ZeroFrequency("rebalancing"));
        }
        if !self.fee_rate.is_finite() || !(0.0..1.0).contains(&self.fee_rate) {
            return Err(InvalidConfigError::InvalidFeeRate(self.fee_rate));
        }
        if let ReturnSource::Bootstrap { block_size: 0, .. } = self.return_source {
            return Err(InvalidConfigError::InvalidBlockSize {
                block_size: 0,
                history_len: 0,
            });
        }
        self.inflation.validate()?;
        Ok(())
    }

    /// Full validation against the number of assets in the market data
    pub fn validate_for_assets(&self, num_assets: usize) -> Result<(), SimulationError> {
        self.validate()?;
        if self.weights.len() != num_assets {
            return Err(DataAlignmentError::AssetCountMismatch {
                assets: num_assets,
                weights: self.weights.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Whether rebalancing happens at step `t`
    #[inline]
    #[must_use]
    pub fn rebalances_at(&self, t: usize) -> bool {
        self.rebalance_every.is_some_and(|every| t % every == 0)
    }

    /// Net cash flow due at step `t`
    #[must_use]
    pub fn net_cash_flow(&self, t: usize) -> f64 {
        self.cash_flows
            .iter()
            .filter(|flow| flow.is_due(t))
            .map(|flow| flow.amount)
            .sum()
    }
}

fn check_initial_value(v: f64) -> Result<(), InvalidConfigError> {
    if !v.is_finite() {
        return Err(InvalidConfigError::NonFinite("initial value"));
    }
    if v < 0.0 {
        return Err(InvalidConfigError::NegativeInitialValue(v));
    }
    Ok(())
}

/// What to report from a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Percentiles in (0, 1)
    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<f64>,
    #[serde(default)]
    pub shortfall_threshold: Option<f64>,
    /// Run seed; drawn from OS entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Return every path in the summary, not only the example paths
    #[serde(default)]
    pub include_paths: bool,
}

fn default_percentiles() -> Vec<f64> {
    vec![0.05, 0.25, 0.50, 0.75, 0.95]
}

impl Default for SimulationRequest {
    fn default() -> Self {
        Self {
            percentiles: default_percentiles(),
            shortfall_threshold: None,
            seed: None,
            include_paths: false,
        }
    }
}

impl SimulationRequest {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_percentiles(mut self, percentiles: Vec<f64>) -> Self {
        self.percentiles = percentiles;
        self
    }

    #[must_use]
    pub fn with_shortfall_threshold(mut self, threshold: f64) -> Self {
        self.shortfall_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn with_all_paths(mut self) -> Self {
        self.include_paths = true;
        self
    }

    /// Percentiles checked and sorted ascending
    pub fn validated_percentiles(&self) -> Result<Vec<f64>, InvalidConfigError> {
        validate_percentiles(&self.percentiles)
    }

    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        self.validated_percentiles()?;
        if let Some(t) = self.shortfall_threshold
            && !t.is_finite()
        {
            return Err(InvalidConfigError::NonFinite("shortfall threshold"));
        }
        Ok(())
    }
}

/// Check that every percentile lies in (0, 1) and appears once; returns
/// them sorted
pub fn validate_percentiles(percentiles: &[f64]) -> Result<Vec<f64>, InvalidConfigError> {
    for &p in percentiles {
        if !(p > 0.0 && p < 1.0) {
            return Err(InvalidConfigError::InvalidPercentile(p));
        }
    }
    let mut sorted = percentiles.to_vec();
    sorted.sort_by(f64::total_cmp);
    if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return Err(InvalidConfigError::DuplicatePercentile(w[0]));
    }
    Ok(sorted)
}
