//! Simulation results
//!
//! Trajectories are produced one per path and live only for the duration
//! of a run; `EnsembleSummary` is the artifact handed back to callers.

use serde::{Deserialize, Serialize};

/// Money of the day, or deflated to money at step 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
    Nominal,
    Real,
}

/// Portfolio values for one simulated path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    /// Index of the path within its run
    pub path_id: usize,
    /// Value at each step; index 0 is the initial value, so the length is
    /// `num_steps + 1`
    pub values: Vec<f64>,
    /// Portfolio return of each step from market moves and fees, before
    /// cash flows; length `num_steps`
    pub returns: Vec<f64>,
    /// Total amount contributed over the path
    pub contributions: f64,
    /// Total amount actually withdrawn over the path
    pub withdrawals: f64,
    /// First step at which the path ran out of money
    pub depleted_at: Option<usize>,
    /// `values` divided by the path's price index
    pub real_values: Vec<f64>,
    /// `returns` net of each step's inflation
    pub real_returns: Vec<f64>,
    /// Contributions, each deflated to step 0 money when it was made
    pub real_contributions: f64,
    pub real_withdrawals: f64,
}

impl Trajectory {
    /// A path with no cash flows whose real series equal its nominal ones
    #[must_use]
    pub fn nominal(path_id: usize, values: Vec<f64>, returns: Vec<f64>) -> Self {
        Self {
            path_id,
            real_values: values.clone(),
            real_returns: returns.clone(),
            values,
            returns,
            contributions: 0.0,
            withdrawals: 0.0,
            depleted_at: None,
            real_contributions: 0.0,
            real_withdrawals: 0.0,
        }
    }

    #[must_use]
    pub fn balances(&self, basis: Basis) -> &[f64] {
        match basis {
            Basis::Nominal => &self.values,
            Basis::Real => &self.real_values,
        }
    }

    #[must_use]
    pub fn step_returns(&self, basis: Basis) -> &[f64] {
        match basis {
            Basis::Nominal => &self.returns,
            Basis::Real => &self.real_returns,
        }
    }

    #[must_use]
    pub fn contributed(&self, basis: Basis) -> f64 {
        match basis {
            Basis::Nominal => self.contributions,
            Basis::Real => self.real_contributions,
        }
    }

    #[must_use]
    pub fn withdrawn(&self, basis: Basis) -> f64 {
        match basis {
            Basis::Nominal => self.withdrawals,
            Basis::Real => self.real_withdrawals,
        }
    }

    #[must_use]
    pub fn initial_value(&self) -> f64 {
        self.values[0]
    }

    #[must_use]
    pub fn terminal_value(&self) -> f64 {
        self.terminal_value_in(Basis::Nominal)
    }

    #[must_use]
    pub fn terminal_value_in(&self, basis: Basis) -> f64 {
        let values = self.balances(basis);
        values[values.len() - 1]
    }

    #[must_use]
    pub fn num_steps(&self) -> usize {
        self.values.len() - 1
    }

    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.depleted_at.is_some()
    }

    /// Average per-step return
    #[must_use]
    pub fn mean_return(&self) -> f64 {
        self.mean_return_in(Basis::Nominal)
    }

    #[must_use]
    pub fn mean_return_in(&self, basis: Basis) -> f64 {
        mean(self.step_returns(basis))
    }

    /// Sample standard deviation of per-step returns
    #[must_use]
    pub fn volatility(&self) -> f64 {
        self.volatility_in(Basis::Nominal)
    }

    #[must_use]
    pub fn volatility_in(&self, basis: Basis) -> f64 {
        let returns = self.step_returns(basis);
        let n = returns.len();
        if n < 2 {
            return 0.0;
        }
        let mean = mean(returns);
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    }

    /// Largest peak-to-trough decline of the value series, as a fraction of
    /// the peak (0 = no drawdown, 1 = total loss)
    #[must_use]
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown_in(Basis::Nominal)
    }

    #[must_use]
    pub fn max_drawdown_in(&self, basis: Basis) -> f64 {
        let mut peak = f64::NEG_INFINITY;
        let mut worst: f64 = 0.0;
        for &v in self.balances(basis) {
            peak = peak.max(v);
            if peak > 0.0 {
                worst = worst.max((peak - v) / peak);
            }
        }
        worst
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Balance and return series of one path, as carried in a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    pub id: usize,
    pub balances: Vec<f64>,
    pub real_balances: Vec<f64>,
    pub returns: Vec<f64>,
    pub real_returns: Vec<f64>,
    pub depleted_at: Option<usize>,
}

impl From<&Trajectory> for PathRecord {
    fn from(t: &Trajectory) -> Self {
        Self {
            id: t.path_id,
            balances: t.values.clone(),
            real_balances: t.real_values.clone(),
            returns: t.returns.clone(),
            real_returns: t.real_returns.clone(),
            depleted_at: t.depleted_at,
        }
    }
}

/// Value at a given percentile across all paths at one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value: f64,
}

/// One percentile traced across every step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileBand {
    pub percentile: f64,
    /// Length `num_steps + 1`
    pub values: Vec<f64>,
}

/// Distribution of final portfolio values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Vec<PercentileValue>,
}

/// Percentile of a per-path metric, with a representative path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPoint {
    pub percentile: f64,
    pub value: f64,
    /// Path whose metric lies closest to `value`
    pub example_path_id: usize,
}

/// Per-path metric distributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMetrics {
    pub end_balance: Vec<MetricPoint>,
    pub mean_return: Vec<MetricPoint>,
    pub volatility: Vec<MetricPoint>,
    pub max_drawdown: Vec<MetricPoint>,
    pub contributions: Vec<MetricPoint>,
    pub withdrawals: Vec<MetricPoint>,
}

/// Bands, terminal statistics and metrics on one basis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSummary {
    pub percentile_bands: Vec<PercentileBand>,
    pub terminal: TerminalStatistics,
    pub shortfall_probability: Option<f64>,
    pub metrics: PathMetrics,
}

impl ValueSummary {
    #[must_use]
    pub fn band(&self, percentile: f64) -> Option<&PercentileBand> {
        find_band(&self.percentile_bands, percentile)
    }

    #[must_use]
    pub fn terminal_percentile(&self, percentile: f64) -> Option<f64> {
        find_terminal(&self.terminal, percentile)
    }
}

/// Summary of a full ensemble run
///
/// Top-level statistics are nominal; `real` holds the same statistics on
/// inflation-adjusted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleSummary {
    /// Seed that reproduces this run
    pub seed: u64,
    pub num_paths: usize,
    pub num_steps: usize,
    pub percentile_bands: Vec<PercentileBand>,
    pub terminal: TerminalStatistics,
    /// Fraction of paths ending strictly below the threshold, when one was
    /// requested
    pub shortfall_probability: Option<f64>,
    pub shortfall_threshold: Option<f64>,
    /// Fraction of paths that ran out of money
    pub depletion_probability: f64,
    pub metrics: PathMetrics,
    pub real: ValueSummary,
    /// Every path named by an `example_path_id`, ascending by id; every
    /// path when the request asked for all of them
    pub paths: Vec<PathRecord>,
}

impl EnsembleSummary {
    /// Band for a requested percentile, matched within a small tolerance
    #[must_use]
    pub fn band(&self, percentile: f64) -> Option<&PercentileBand> {
        find_band(&self.percentile_bands, percentile)
    }

    /// Terminal value at a requested percentile
    #[must_use]
    pub fn terminal_percentile(&self, percentile: f64) -> Option<f64> {
        find_terminal(&self.terminal, percentile)
    }

    #[must_use]
    pub fn path(&self, id: usize) -> Option<&PathRecord> {
        self.paths
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|i| &self.paths[i])
    }

    /// Every example path id referenced by the nominal and real metrics
    pub fn example_path_ids(&self) -> impl Iterator<Item = usize> + '_ {
        [&self.metrics, &self.real.metrics]
            .into_iter()
            .flat_map(PathMetrics::points)
            .map(|point| point.example_path_id)
    }
}

impl PathMetrics {
    pub fn points(&self) -> impl Iterator<Item = &MetricPoint> {
        [
            &self.end_balance,
            &self.mean_return,
            &self.volatility,
            &self.max_drawdown,
            &self.contributions,
            &self.withdrawals,
        ]
        .into_iter()
        .flatten()
    }
}

fn find_band(bands: &[PercentileBand], percentile: f64) -> Option<&PercentileBand> {
    bands
        .iter()
        .find(|b| (b.percentile - percentile).abs() < 1e-9)
}

fn find_terminal(terminal: &TerminalStatistics, percentile: f64) -> Option<f64> {
    terminal
        .percentiles
        .iter()
        .find(|p| (p.percentile - percentile).abs() < 1e-9)
        .map(|p| p.value)
}
