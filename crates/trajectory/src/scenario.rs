//! Scenario files
//!
//! A scenario bundles everything a run needs except the price data:
//!
//! ```yaml
//! name: balanced
//! symbols: [STOCK, BOND]
//! start: 2010-01-01
//! model:
//!   type: bootstrap
//!   block_size: 12
//! simulation:
//!   num_paths: 5000
//!   num_steps: 360
//!   initial_value: 250000
//!   weights: [0.6, 0.4]
//!   rebalance_every: 12
//!   cash_flows:
//!     - { amount: -1000, every: 1, start_step: 121 }
//!   inflation: { type: normal, mean: 0.002, std_dev: 0.001 }
//! percentiles: [5, 25, 50, 75, 95]
//! shortfall_threshold: 250000
//! seed: 42
//! ```
//!
//! Files ending in `.json` are parsed as JSON, everything else as YAML.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use trajectory_core::config::{ReturnSource, SimulationConfig, SimulationRequest};
use trajectory_core::model::ReturnModel;
use trajectory_core::provider::HistoryRequest;

/// Serialization format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    pub fn parse<T: serde::de::DeserializeOwned>(self, content: &str) -> Result<T> {
        match self {
            FileFormat::Yaml => serde_saphyr::from_str(content).map_err(|e| eyre!("{e}")),
            FileFormat::Json => Ok(serde_json::from_str(content)?),
        }
    }
}

fn default_percentiles() -> Vec<u8> {
    vec![5, 25, 50, 75, 95]
}

/// Where returns come from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSection {
    /// Mean and covariance estimated from the history file
    #[default]
    Statistical,
    /// Explicit per-step mean and covariance; no history needed
    Parametric {
        mean: Vec<f64>,
        covariance: Vec<Vec<f64>>,
    },
    /// Resampled blocks of historical returns
    Bootstrap {
        #[serde(default = "default_block_size")]
        block_size: usize,
        #[serde(default = "default_circular")]
        circular: bool,
    },
}

fn default_block_size() -> usize {
    1
}

fn default_circular() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    /// Assets in weight order; empty means every asset in the history file
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub start: Option<Date>,
    #[serde(default)]
    pub end: Option<Date>,
    #[serde(default)]
    pub model: ModelSection,
    pub simulation: SimulationConfig,
    /// Integer percentiles in 1..=99
    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<u8>,
    #[serde(default)]
    pub shortfall_threshold: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Carry every path's series in the summary, not only the example paths
    #[serde(default)]
    pub include_paths: bool,
}

/// A scenario turned into engine inputs
#[derive(Debug, Clone)]
pub struct ResolvedScenario {
    pub name: String,
    pub config: SimulationConfig,
    pub request: SimulationRequest,
    pub history_request: HistoryRequest,
    /// Present for parametric scenarios, which skip the history file
    pub model: Option<ReturnModel>,
}

impl ResolvedScenario {
    #[must_use]
    pub fn needs_history(&self) -> bool {
        self.model.is_none()
    }
}

impl Scenario {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read scenario {}", path.display()))?;
        FileFormat::from_path(path)
            .parse(&content)
            .wrap_err_with(|| format!("Failed to parse scenario {}", path.display()))
    }

    /// Validate the scenario and build engine inputs.
    ///
    /// Checks that do not need price data happen here, so `validate` can
    /// report them without loading history.
    pub fn resolve(self) -> Result<ResolvedScenario> {
        for &p in &self.percentiles {
            if !(1..=99).contains(&p) {
                bail!("Percentile {p} is outside 1..=99");
            }
        }
        if let (Some(start), Some(end)) = (self.start, self.end)
            && start > end
        {
            bail!("Start date {start} is after end date {end}");
        }

        let mut config = self.simulation;
        config.return_source = match self.model {
            ModelSection::Bootstrap {
                block_size,
                circular,
            } => ReturnSource::Bootstrap {
                block_size,
                circular,
            },
            ModelSection::Statistical | ModelSection::Parametric { .. } => {
                ReturnSource::Statistical
            }
        };
        config.validate()?;
        if !self.symbols.is_empty() && self.symbols.len() != config.num_assets() {
            bail!(
                "{} symbols listed but {} weights given",
                self.symbols.len(),
                config.num_assets()
            );
        }

        let model = match self.model {
            ModelSection::Parametric { mean, covariance } => {
                let symbols = if self.symbols.is_empty() {
                    (0..mean.len()).map(|i| format!("ASSET{}", i + 1)).collect()
                } else {
                    self.symbols.clone()
                };
                Some(ReturnModel::from_parameters(
                    symbols,
                    mean,
                    covariance,
                    config.return_kind,
                )?)
            }
            _ => None,
        };

        let request = SimulationRequest {
            percentiles: self.percentiles.iter().map(|&p| f64::from(p) / 100.0).collect(),
            shortfall_threshold: self.shortfall_threshold,
            seed: self.seed,
            include_paths: self.include_paths,
        };
        request.validate()?;

        Ok(ResolvedScenario {
            name: self.name.unwrap_or_else(|| "scenario".to_string()),
            config,
            request,
            history_request: HistoryRequest::new(self.symbols).between(self.start, self.end),
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trajectory_core::config::CashFlowAllocation;
    use trajectory_core::model::InflationProfile;

    const BOOTSTRAP_YAML: &str = r#"
name: balanced
symbols: [STOCK, BOND]
start: "2010-01-01"
end: "2020-12-31"
model:
  type: bootstrap
  block_size: 12
simulation:
  num_paths: 500
  num_steps: 120
  initial_value: 250000
  weights: [0.6, 0.4]
  rebalance_every: 12
  cash_flow_allocation:
    policy: asset
    index: 1
  cash_flows:
    - amount: -1000
      every: 1
      start_step: 61
percentiles: [10, 50, 90]
shortfall_threshold: 200000
seed: 7
"#;

    #[test]
    fn test_yaml_scenario_resolves() {
        let scenario: Scenario = FileFormat::Yaml.parse(BOOTSTRAP_YAML).unwrap();
        let resolved = scenario.resolve().unwrap();

        assert_eq!(resolved.name, "balanced");
        assert!(resolved.needs_history());
        assert_eq!(
            resolved.config.return_source,
            ReturnSource::Bootstrap {
                block_size: 12,
                circular: true
            }
        );
        assert_eq!(
            resolved.config.cash_flow_allocation,
            CashFlowAllocation::Asset { index: 1 }
        );
        assert_eq!(resolved.request.percentiles, vec![0.1, 0.5, 0.9]);
        assert_eq!(resolved.request.seed, Some(7));
        assert_eq!(resolved.history_request.symbols, vec!["STOCK", "BOND"]);
        assert_eq!(
            resolved.history_request.start,
            Some(jiff::civil::date(2010, 1, 1))
        );
    }

    #[test]
    fn test_json_parametric_scenario() {
        let json = r#"{
            "model": {
                "type": "parametric",
                "mean": [0.005, 0.002],
                "covariance": [[0.002, 0.0], [0.0, 0.0005]]
            },
            "simulation": { "num_paths": 100, "num_steps": 24, "weights": [0.5, 0.5] }
        }"#;
        let scenario: Scenario = FileFormat::Json.parse(json).unwrap();
        let resolved = scenario.resolve().unwrap();

        assert!(!resolved.needs_history());
        let model = resolved.model.unwrap();
        assert_eq!(model.symbols(), ["ASSET1".to_string(), "ASSET2".to_string()]);
        assert_eq!(resolved.request.percentiles.len(), 5);
    }

    #[test]
    fn test_inflation_and_path_output() {
        let yaml = r#"
simulation:
  weights: [1.0]
  inflation:
    type: fixed
    rate: 0.002
include_paths: true
"#;
        let scenario: Scenario = FileFormat::Yaml.parse(yaml).unwrap();
        let resolved = scenario.resolve().unwrap();

        assert_eq!(resolved.config.inflation, InflationProfile::Fixed { rate: 0.002 });
        assert!(resolved.request.include_paths);

        let yaml = "simulation:\n  weights: [1.0]\n  inflation: { type: fixed, rate: -1.5 }\n";
        let scenario: Scenario = FileFormat::Yaml.parse(yaml).unwrap();
        let err = scenario.resolve().unwrap_err();
        assert!(err.to_string().contains("inflation"), "{err}");
    }

    #[test]
    fn test_out_of_range_percentile_rejected() {
        let yaml = "simulation:\n  weights: [1.0]\npercentiles: [0, 50]\n";
        let scenario: Scenario = FileFormat::Yaml.parse(yaml).unwrap();
        let err = scenario.resolve().unwrap_err();
        assert!(err.to_string().contains("outside 1..=99"));
    }

    #[test]
    fn test_symbol_count_must_match_weights() {
        let yaml = "symbols: [A, B, C]\nsimulation:\n  weights: [0.5, 0.5]\n";
        let scenario: Scenario = FileFormat::Yaml.parse(yaml).unwrap();
        assert!(scenario.resolve().is_err());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let yaml = "simulation:\n  weights: [0.5, 0.4]\n";
        let scenario: Scenario = FileFormat::Yaml.parse(yaml).unwrap();
        let err = scenario.resolve().unwrap_err();
        assert!(err.to_string().contains("sum"), "{err}");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.json")), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("a.yaml")), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("a")), FileFormat::Yaml);
    }
}
