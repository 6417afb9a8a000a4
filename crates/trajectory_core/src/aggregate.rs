//! Ensemble statistics over a set of trajectories.
//!
//! Every statistic is computed from sorted copies of the per-path values, so
//! the summary depends only on the multiset of trajectories and not on the
//! order in which paths finished.

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::InsufficientSampleError;
use crate::model::{
    Basis, EnsembleSummary, MetricPoint, PathMetrics, PathRecord, PercentileBand,
    PercentileValue, TerminalStatistics, Trajectory, ValueSummary,
};

/// Linear interpolation between closest ranks, `h = (n - 1) * p`.
///
/// `sorted` must be non-empty and ascending; `p` in `[0, 1]`.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * p;
    let lo = (h.floor() as usize).min(n - 1);
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    (sorted[lo] + (sorted[hi] - sorted[lo]) * frac).min(sorted[hi])
}

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}

fn mean_and_std(sorted: &[f64]) -> (f64, f64) {
    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    if sorted.len() < 2 {
        return (mean, 0.0);
    }
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

/// Summarize an ensemble.
///
/// `percentiles` are expected validated and ascending (see
/// [`crate::config::validate_percentiles`]). A shortfall counts paths whose
/// terminal value is strictly below `shortfall_threshold`. The summary
/// carries the paths its metrics point at.
pub fn aggregate(
    trajectories: &[Trajectory],
    percentiles: &[f64],
    shortfall_threshold: Option<f64>,
    seed: u64,
) -> Result<EnsembleSummary, InsufficientSampleError> {
    let Some(first) = trajectories.first() else {
        return Err(InsufficientSampleError);
    };
    let num_paths = trajectories.len();
    let num_steps = first.num_steps();

    let nominal = summarize(trajectories, percentiles, shortfall_threshold, Basis::Nominal);
    let real = summarize(trajectories, percentiles, shortfall_threshold, Basis::Real);
    let depletion_probability =
        trajectories.iter().filter(|t| t.is_depleted()).count() as f64 / num_paths as f64;
    let paths = referenced_paths(trajectories, &[&nominal.metrics, &real.metrics]);

    let ValueSummary {
        percentile_bands,
        terminal,
        shortfall_probability,
        metrics,
    } = nominal;
    Ok(EnsembleSummary {
        seed,
        num_paths,
        num_steps,
        percentile_bands,
        terminal,
        shortfall_probability,
        shortfall_threshold,
        depletion_probability,
        metrics,
        real,
        paths,
    })
}

fn summarize(
    trajectories: &[Trajectory],
    percentiles: &[f64],
    shortfall_threshold: Option<f64>,
    basis: Basis,
) -> ValueSummary {
    let num_paths = trajectories.len();
    let columns = step_percentiles(trajectories, percentiles, basis);
    let percentile_bands = percentiles
        .iter()
        .enumerate()
        .map(|(i, &p)| PercentileBand {
            percentile: p,
            values: columns.iter().map(|column| column[i]).collect(),
        })
        .collect();

    let terminal_sorted = sorted(
        trajectories
            .iter()
            .map(|t| t.terminal_value_in(basis))
            .collect(),
    );
    let (mean, std_dev) = mean_and_std(&terminal_sorted);
    let terminal = TerminalStatistics {
        mean,
        std_dev,
        min: terminal_sorted[0],
        max: terminal_sorted[num_paths - 1],
        percentiles: percentiles
            .iter()
            .map(|&p| PercentileValue {
                percentile: p,
                value: percentile(&terminal_sorted, p),
            })
            .collect(),
    };

    let shortfall_probability = shortfall_threshold.map(|threshold| {
        terminal_sorted.iter().filter(|&&v| v < threshold).count() as f64 / num_paths as f64
    });

    let metrics = PathMetrics {
        end_balance: metric_points(trajectories, percentiles, |t| t.terminal_value_in(basis)),
        mean_return: metric_points(trajectories, percentiles, |t| t.mean_return_in(basis)),
        volatility: metric_points(trajectories, percentiles, |t| t.volatility_in(basis)),
        max_drawdown: metric_points(trajectories, percentiles, |t| t.max_drawdown_in(basis)),
        contributions: metric_points(trajectories, percentiles, |t| t.contributed(basis)),
        withdrawals: metric_points(trajectories, percentiles, |t| t.withdrawn(basis)),
    };

    ValueSummary {
        percentile_bands,
        terminal,
        shortfall_probability,
        metrics,
    }
}

/// `result[step][i]` is the `percentiles[i]` value across paths at `step`
fn step_percentiles(
    trajectories: &[Trajectory],
    percentiles: &[f64],
    basis: Basis,
) -> Vec<Vec<f64>> {
    let num_steps = trajectories[0].num_steps();
    let column = |step: usize| {
        let values = sorted(trajectories.iter().map(|t| t.balances(basis)[step]).collect());
        percentiles
            .iter()
            .map(|&p| percentile(&values, p))
            .collect::<Vec<f64>>()
    };

    #[cfg(feature = "parallel")]
    let columns = (0..=num_steps).into_par_iter().map(column).collect();
    #[cfg(not(feature = "parallel"))]
    let columns = (0..=num_steps).map(column).collect();

    columns
}

/// Records of the paths named by `metrics`, ascending by id
fn referenced_paths(trajectories: &[Trajectory], metrics: &[&PathMetrics]) -> Vec<PathRecord> {
    let mut ids: Vec<usize> = metrics
        .iter()
        .flat_map(|m| m.points())
        .map(|point| point.example_path_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let mut paths: Vec<PathRecord> = trajectories
        .iter()
        .filter(|t| ids.binary_search(&t.path_id).is_ok())
        .map(PathRecord::from)
        .collect();
    paths.sort_by_key(|p| p.id);
    paths.dedup_by_key(|p| p.id);
    paths
}

fn metric_points(
    trajectories: &[Trajectory],
    percentiles: &[f64],
    metric: impl Fn(&Trajectory) -> f64,
) -> Vec<MetricPoint> {
    let values: Vec<(f64, usize)> = trajectories
        .iter()
        .map(|t| (metric(t), t.path_id))
        .collect();
    let sorted_values = sorted(values.iter().map(|(v, _)| *v).collect());

    percentiles
        .iter()
        .map(|&p| {
            let value = percentile(&sorted_values, p);
            MetricPoint {
                percentile: p,
                value,
                example_path_id: closest_path(&values, value),
            }
        })
        .collect()
}

/// Path whose metric is nearest to `target`; ties go to the lowest id
fn closest_path(values: &[(f64, usize)], target: f64) -> usize {
    values
        .iter()
        .map(|&(v, id)| ((v - target).abs(), id))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map_or(0, |(_, id)| id)
}
