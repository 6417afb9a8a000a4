//! The `run` and `validate` commands

use std::path::PathBuf;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr, eyre};
use trajectory_core::error::SimulationError;
use trajectory_core::model::EnsembleSummary;
use trajectory_core::progress::SimulationProgress;
use trajectory_core::provider::PriceHistoryProvider;
use trajectory_core::simulation::{simulate_with_model_and_progress, simulate_with_progress};

use crate::history_file::HistoryFile;
use crate::report;
use crate::scenario::{ResolvedScenario, Scenario};
use crate::util::atomic_write;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub scenario: PathBuf,
    pub history: Option<PathBuf>,
    /// Where to write the JSON summary
    pub output: Option<PathBuf>,
    /// Overrides the scenario's seed
    pub seed: Option<u64>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub name: String,
    pub summary: EnsembleSummary,
}

/// Parse and validate a scenario file without running it
pub fn validate_scenario(path: &std::path::Path) -> Result<ResolvedScenario> {
    let resolved = Scenario::from_path(path)?
        .resolve()
        .wrap_err_with(|| format!("Invalid scenario {}", path.display()))?;
    tracing::info!(
        scenario = %resolved.name,
        paths = resolved.config.num_paths,
        steps = resolved.config.num_steps,
        "Scenario is valid"
    );
    Ok(resolved)
}

pub fn run_scenario(options: &RunOptions) -> Result<RunOutcome> {
    let mut resolved = validate_scenario(&options.scenario)?;
    if options.seed.is_some() {
        resolved.request.seed = options.seed;
    }

    let summary = match &resolved.model {
        Some(model) => {
            let progress = progress(options.timeout);
            simulate_with_model_and_progress(model, &resolved.config, &resolved.request, &progress)?
        }
        None => {
            let path = options.history.as_ref().ok_or_else(|| {
                eyre!("Scenario '{}' needs price history; pass --history", resolved.name)
            })?;
            let provider = HistoryFile::from_path(path)?.into_provider()?;
            let history = provider
                .fetch(&resolved.history_request)
                .map_err(SimulationError::HistoryUnavailable)?;

            let progress = progress(options.timeout);
            simulate_with_progress(&history, &resolved.config, &resolved.request, &progress)?
        }
    };

    if let Some(output) = &options.output {
        atomic_write(output, &report::to_json(&summary)?)
            .wrap_err_with(|| format!("Failed to write summary to {}", output.display()))?;
        tracing::info!(path = %output.display(), "Summary written");
    }

    Ok(RunOutcome {
        name: resolved.name,
        summary,
    })
}

fn progress(timeout: Option<Duration>) -> SimulationProgress {
    match timeout {
        Some(timeout) => SimulationProgress::default().with_timeout(timeout),
        None => SimulationProgress::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    use crate::history_file::AssetPrices;

    fn write_history(dir: &std::path::Path) -> PathBuf {
        let dates = (0..36)
            .map(|i| jiff::civil::date(2020, 1, 1).saturating_add(jiff::Span::new().days(i)))
            .collect();
        let wave = |scale: f64, i: usize| 100.0 * (1.0 + scale * ((i as f64) * 0.7).sin());
        let file = HistoryFile {
            dates,
            assets: vec![
                AssetPrices {
                    symbol: "STOCK".into(),
                    prices: (0..36).map(|i| wave(0.1, i) * 1.01_f64.powi(i as i32)).collect(),
                },
                AssetPrices {
                    symbol: "BOND".into(),
                    prices: (0..36).map(|i| wave(0.01, i)).collect(),
                },
            ],
        };
        let path = dir.join("prices.json");
        fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_run_writes_summary() {
        let dir = tempdir().unwrap();
        let scenario = dir.path().join("scenario.yaml");
        fs::write(
            &scenario,
            r#"
name: smoke
symbols: [BOND, STOCK]
simulation:
  num_paths: 40
  num_steps: 12
  weights: [0.3, 0.7]
percentiles: [10, 90]
seed: 5
"#,
        )
        .unwrap();
        let output = dir.path().join("out.json");

        let options = RunOptions {
            scenario,
            history: Some(write_history(dir.path())),
            output: Some(output.clone()),
            ..Default::default()
        };
        let first = run_scenario(&options).unwrap();
        assert_eq!(first.name, "smoke");
        assert_eq!(first.summary.num_paths, 40);
        assert_eq!(first.summary.seed, 5);

        let written: EnsembleSummary =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written.num_steps, 12);
        assert_eq!(written.percentile_bands.len(), 2);

        let reseeded = run_scenario(&RunOptions {
            seed: Some(6),
            output: None,
            ..options
        })
        .unwrap();
        assert_eq!(reseeded.summary.seed, 6);
    }

    #[test]
    fn test_history_is_required_unless_parametric() {
        let dir = tempdir().unwrap();
        let scenario = dir.path().join("scenario.yaml");
        let simulation = "simulation:\n  num_paths: 5\n  num_steps: 5\n  weights: [1.0]\n";
        fs::write(&scenario, simulation).unwrap();

        let missing = run_scenario(&RunOptions {
            scenario: scenario.clone(),
            ..Default::default()
        });
        assert!(missing.unwrap_err().to_string().contains("--history"));

        let model = "model:\n  type: parametric\n  mean: [0.01]\n  covariance: [[0.0]]\n";
        fs::write(&scenario, format!("{model}{simulation}")).unwrap();
        let outcome = run_scenario(&RunOptions {
            scenario,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(outcome.summary.num_paths, 5);
    }

    #[test]
    fn test_unknown_symbol_is_history_unavailable() {
        let dir = tempdir().unwrap();
        let scenario = dir.path().join("scenario.json");
        fs::write(
            &scenario,
            r#"{
                "symbols": ["GOLD"],
                "simulation": {"num_paths": 5, "num_steps": 5, "weights": [1.0]}
            }"#,
        )
        .unwrap();

        let err = run_scenario(&RunOptions {
            scenario,
            history: Some(write_history(dir.path())),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SimulationError>(),
            Some(SimulationError::HistoryUnavailable(_))
        ));
    }
}
