//! Portfolio trajectories and ensemble orchestration
//!
//! `simulate_path` is a pure function of the configuration, one path's
//! returns and its price index. `run_ensemble` maps it over every path
//! index and collects in index order, so the ensemble is the same whether
//! paths run on one thread or many.

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::aggregate::aggregate;
use crate::config::{CashFlowAllocation, ReturnSource, SimulationConfig, SimulationRequest};
use crate::error::{InvalidConfigError, Result, SimulationError};
use crate::estimator::estimate;
use crate::generator::{BlockBootstrap, PathGenerator, PathReturns, ReturnSampler, fresh_seed};
use crate::model::{
    EnsembleSummary, PathRecord, PriceHistory, ReturnKind, ReturnModel, Trajectory,
};
use crate::progress::SimulationProgress;
use crate::provider::{HistoryRequest, PriceHistoryProvider};

// ============================================================================
// Single path
// ============================================================================

/// A withdrawal within this fraction of the portfolio value empties it
const DEPLETION_TOLERANCE: f64 = 1e-9;

/// What one step did to a path
#[derive(Debug, Clone, Copy, PartialEq)]
struct Step {
    /// Return from market moves and the fee; `None` when nothing was invested
    growth: Option<f64>,
    contributed: f64,
    withdrawn: f64,
    /// Value after cash flows and rebalancing
    value: f64,
    depleted: bool,
}

/// Apply returns, fee, cash flows and rebalancing for step `t` to the
/// sub-balances of a live path
fn advance(
    config: &SimulationConfig,
    t: usize,
    balances: &mut [f64],
    asset_returns: &[f64],
    kind: ReturnKind,
    was_positive: bool,
) -> Step {
    let start_total: f64 = balances.iter().sum();
    for (balance, &r) in balances.iter_mut().zip(asset_returns) {
        *balance *= kind.growth_factor(r);
    }
    if config.fee_rate > 0.0 {
        for balance in balances.iter_mut() {
            *balance *= 1.0 - config.fee_rate;
        }
    }
    let grown_total: f64 = balances.iter().sum();
    let growth = (start_total > 0.0).then(|| grown_total / start_total - 1.0);

    let flow = config.net_cash_flow(t);
    let mut contributed = 0.0;
    let mut withdrawn = 0.0;
    let mut emptied = false;
    if flow > 0.0 {
        contribute(balances, &config.weights, config.cash_flow_allocation, flow);
        contributed = flow;
    } else if flow < 0.0 {
        let requested = -flow;
        if requested >= grown_total * (1.0 - DEPLETION_TOLERANCE) {
            withdrawn = requested.min(grown_total).max(0.0);
            emptied = true;
        } else {
            withdraw(balances, config.cash_flow_allocation, requested);
            withdrawn = requested;
        }
    }

    let total: f64 = balances.iter().sum();
    if emptied || ((was_positive || contributed > 0.0) && total <= 0.0) {
        balances.fill(0.0);
        return Step {
            growth,
            contributed,
            withdrawn,
            value: 0.0,
            depleted: true,
        };
    }

    let total = total.max(0.0);
    if total > 0.0 && config.rebalances_at(t) {
        for (balance, w) in balances.iter_mut().zip(&config.weights) {
            *balance = w * total;
        }
    }
    Step {
        growth,
        contributed,
        withdrawn,
        value: total,
        depleted: false,
    }
}

/// Roll one path forward through `returns.num_steps()` steps.
///
/// `price_index` is the path's cumulative price level (length
/// `num_steps + 1`); real values are nominal values divided by it.
#[must_use]
pub fn simulate_path(
    config: &SimulationConfig,
    path_id: usize,
    returns: &PathReturns,
    kind: ReturnKind,
    price_index: &[f64],
) -> Trajectory {
    let num_steps = returns.num_steps();
    debug_assert_eq!(price_index.len(), num_steps + 1);
    let initial = config.initial_value.for_path(path_id);
    let mut balances: Vec<f64> = config.weights.iter().map(|w| w * initial).collect();

    let mut values = Vec::with_capacity(num_steps + 1);
    let mut real_values = Vec::with_capacity(num_steps + 1);
    let mut step_returns = Vec::with_capacity(num_steps);
    let mut real_returns = Vec::with_capacity(num_steps);
    values.push(initial);
    real_values.push(initial / price_index[0]);

    let mut contributions = 0.0;
    let mut withdrawals = 0.0;
    let mut real_contributions = 0.0;
    let mut real_withdrawals = 0.0;
    let mut depleted_at = None;
    let mut was_positive = initial > 0.0;

    for t in 1..=num_steps {
        if depleted_at.is_some() {
            values.push(0.0);
            real_values.push(0.0);
            step_returns.push(0.0);
            real_returns.push(0.0);
            continue;
        }

        let step = advance(config, t, &mut balances, returns.step(t - 1), kind, was_positive);
        let level = price_index[t];
        let inflation = level / price_index[t - 1];

        step_returns.push(step.growth.unwrap_or(0.0));
        real_returns.push(step.growth.map_or(0.0, |g| (1.0 + g) / inflation - 1.0));
        contributions += step.contributed;
        withdrawals += step.withdrawn;
        real_contributions += step.contributed / level;
        real_withdrawals += step.withdrawn / level;
        values.push(step.value);
        real_values.push(step.value / level);

        if step.depleted {
            depleted_at = Some(t);
        }
        was_positive |= step.contributed > 0.0 || step.value > 0.0;
    }

    Trajectory {
        path_id,
        values,
        returns: step_returns,
        contributions,
        withdrawals,
        depleted_at,
        real_values,
        real_returns,
        real_contributions,
        real_withdrawals,
    }
}

fn contribute(balances: &mut [f64], weights: &[f64], allocation: CashFlowAllocation, amount: f64) {
    match allocation {
        CashFlowAllocation::Asset { index } => balances[index] += amount,
        CashFlowAllocation::ProRata => {
            let total: f64 = balances.iter().sum();
            if total > 0.0 {
                for balance in balances.iter_mut() {
                    *balance += amount * *balance / total;
                }
            } else {
                for (balance, w) in balances.iter_mut().zip(weights) {
                    *balance += amount * w;
                }
            }
        }
    }
}

/// Take `amount` out of the balances; the caller guarantees it does not
/// exceed their sum
fn withdraw(balances: &mut [f64], allocation: CashFlowAllocation, amount: f64) {
    let remaining = match allocation {
        CashFlowAllocation::ProRata => amount,
        CashFlowAllocation::Asset { index } => {
            let taken = balances[index].min(amount).max(0.0);
            balances[index] -= taken;
            amount - taken
        }
    };
    if remaining <= 0.0 {
        return;
    }
    let total: f64 = balances.iter().sum();
    if total <= 0.0 {
        return;
    }
    for balance in balances.iter_mut() {
        *balance = (*balance - remaining * *balance / total).max(0.0);
    }
}

// ============================================================================
// Ensemble
// ============================================================================

/// Simulate every path of `config` with returns drawn from `sampler`.
///
/// `config` is validated against the sampler's asset count first. Then
/// `progress` is reset to `config.num_paths`, advanced once per finished
/// path and checked before each path starts.
pub fn run_ensemble<S: ReturnSampler + ?Sized>(
    sampler: &S,
    config: &SimulationConfig,
    seed: u64,
    progress: &SimulationProgress,
) -> Result<Vec<Trajectory>> {
    config.validate_for_assets(sampler.num_assets())?;
    progress.reset(config.num_paths);
    let kind = sampler.kind();

    let run_path = |path: usize| -> Result<Trajectory> {
        progress.check()?;
        let returns = sampler.sample_path(seed, path, config.num_steps);
        let price_index = config.inflation.price_index(seed, path, config.num_steps)?;
        let trajectory = simulate_path(config, path, &returns, kind, &price_index);
        progress.increment();
        Ok(trajectory)
    };

    #[cfg(feature = "parallel")]
    let trajectories = (0..config.num_paths).into_par_iter().map(run_path).collect();
    #[cfg(not(feature = "parallel"))]
    let trajectories = (0..config.num_paths).map(run_path).collect();

    trajectories
}

/// Sampler for a history-based run
fn history_sampler(
    history: &PriceHistory,
    config: &SimulationConfig,
) -> Result<Box<dyn ReturnSampler>> {
    Ok(match config.return_source {
        ReturnSource::Statistical => {
            let model = estimate(history, config.return_kind)?;
            Box::new(PathGenerator::with_step_length(&model, config.step_length))
        }
        ReturnSource::Bootstrap {
            block_size,
            circular,
        } => Box::new(BlockBootstrap::new(
            history,
            config.return_kind,
            block_size,
            circular,
            config.step_length,
        )?),
    })
}

fn run_and_summarize(
    sampler: &dyn ReturnSampler,
    config: &SimulationConfig,
    request: &SimulationRequest,
    percentiles: &[f64],
    progress: &SimulationProgress,
) -> Result<EnsembleSummary> {
    let seed = request.seed.unwrap_or_else(fresh_seed);
    tracing::info!(
        paths = config.num_paths,
        steps = config.num_steps,
        assets = sampler.num_assets(),
        seed,
        "Starting simulation"
    );

    let trajectories = run_ensemble(sampler, config, seed, progress).inspect_err(|e| {
        tracing::warn!(error = %e, completed = progress.completed(), "Simulation stopped");
    })?;
    let mut summary = aggregate(&trajectories, percentiles, request.shortfall_threshold, seed)?;
    if request.include_paths {
        summary.paths = trajectories.iter().map(PathRecord::from).collect();
    }

    tracing::info!(
        seed,
        depletion = summary.depletion_probability,
        median = ?summary.terminal_percentile(0.5),
        "Simulation complete"
    );
    Ok(summary)
}

/// Calibrate on `history`, simulate every path and summarize the ensemble
pub fn simulate(
    history: &PriceHistory,
    config: &SimulationConfig,
    request: &SimulationRequest,
) -> Result<EnsembleSummary> {
    simulate_with_progress(history, config, request, &SimulationProgress::default())
}

/// [`simulate`] with caller-visible progress, cancellation and deadline
pub fn simulate_with_progress(
    history: &PriceHistory,
    config: &SimulationConfig,
    request: &SimulationRequest,
    progress: &SimulationProgress,
) -> Result<EnsembleSummary> {
    config.validate_for_assets(history.num_assets())?;
    request.validate()?;
    let percentiles = request.validated_percentiles()?;

    let sampler = history_sampler(history, config)?;
    run_and_summarize(sampler.as_ref(), config, request, &percentiles, progress)
}

/// Simulate from a pre-built parametric model
pub fn simulate_with_model(
    model: &ReturnModel,
    config: &SimulationConfig,
    request: &SimulationRequest,
) -> Result<EnsembleSummary> {
    simulate_with_model_and_progress(model, config, request, &SimulationProgress::default())
}

pub fn simulate_with_model_and_progress(
    model: &ReturnModel,
    config: &SimulationConfig,
    request: &SimulationRequest,
    progress: &SimulationProgress,
) -> Result<EnsembleSummary> {
    config.validate_for_assets(model.num_assets())?;
    if let ReturnSource::Bootstrap { .. } = config.return_source {
        return Err(InvalidConfigError::HistoryRequired("bootstrap").into());
    }
    request.validate()?;
    let percentiles = request.validated_percentiles()?;

    let sampler = PathGenerator::with_step_length(model, config.step_length);
    run_and_summarize(&sampler, config, request, &percentiles, progress)
}

/// Fetch history from `provider`, then [`simulate`]
pub fn simulate_from_provider<P: PriceHistoryProvider + ?Sized>(
    provider: &P,
    history_request: &HistoryRequest,
    config: &SimulationConfig,
    request: &SimulationRequest,
) -> Result<EnsembleSummary> {
    config.validate()?;
    request.validate()?;
    let history = provider
        .fetch(history_request)
        .map_err(SimulationError::HistoryUnavailable)?;
    simulate(&history, config, request)
}
