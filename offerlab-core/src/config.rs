//! Serializable simulation configuration (TOML).
//!
//! ```toml
//! iterations = 1000
//! seed = 42
//!
//! [[items]]
//! id = "A"
//! weight = 4
//!
//! [[items]]
//! id = "B"
//! weight = 2
//!
//! [targets]   # optional, defaults to each item's share of the total weight
//! A = 0.6
//! B = 0.4
//!
//! [click_model]   # optional
//! first_click = 0.3
//! second_click = 0.5
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::{TargetRatios, WeightedItem};
use crate::report::SimulationReport;
use crate::rng::{DrawSource, RngHierarchy};
use crate::simulator::{ClickModel, SimulationError, Simulator};

/// Iteration count of the reference dataset.
pub const DEFAULT_ITERATIONS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub items: Vec<WeightedItem>,
    /// Missing means proportional to the initial weights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<TargetRatios>,
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub click_model: ClickModel,
}

fn default_iterations() -> u64 {
    DEFAULT_ITERATIONS
}

impl Default for SimulationConfig {
    /// Four offers weighted 4/2/2/1, targets proportional to weight, 1000 trials.
    fn default() -> Self {
        Self {
            items: vec![
                WeightedItem::new("A", 4),
                WeightedItem::new("B", 2),
                WeightedItem::new("C", 2),
                WeightedItem::new("D", 1),
            ],
            targets: None,
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            click_model: ClickModel::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Explicit targets, or each item's share of the initial total weight.
    pub fn resolved_targets(&self) -> TargetRatios {
        self.targets
            .clone()
            .unwrap_or_else(|| TargetRatios::proportional_to(&self.items))
    }

    /// Build an idle simulator drawing from `source`.
    pub fn simulator<D: DrawSource>(&self, source: D) -> Result<Simulator<D>, SimulationError> {
        Simulator::new(
            self.items.clone(),
            self.resolved_targets(),
            self.iterations,
            self.click_model,
            source,
        )
    }

    /// Run the same checks `simulator()` would, without a random source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::domain::validate_items(&self.items).map_err(SimulationError::from)?;
        self.resolved_targets()
            .validate_for(&self.items)
            .map_err(SimulationError::from)?;
        self.click_model.validate()?;
        if self.iterations == 0 {
            return Err(SimulationError::ZeroIterations.into());
        }
        Ok(())
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two identical configs share a run id, and so share derived seeds in
    /// [`SimulationConfig::run_independent`].
    pub fn run_id(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Several independent runs, each with its own counters and a seed
    /// derived from `hierarchy` and the run index.
    pub fn run_independent(
        &self,
        runs: u64,
        hierarchy: &RngHierarchy,
    ) -> Result<Vec<SimulationReport>, ConfigError> {
        let run_id = self.run_id()?;
        (0..runs)
            .map(|index| -> Result<SimulationReport, ConfigError> {
                let rng = hierarchy.rng_for(&run_id, index);
                Ok(self.simulator(rng)?.run()?)
            })
            .collect()
    }
}
