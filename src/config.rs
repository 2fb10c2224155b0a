//! Pipeline configuration
//!
//! Every section carries `#[serde(default)]`, so a JSON file only needs the
//! keys it wants to change:
//!
//! ```json
//! { "split": { "seed": 7 }, "forest": { "n_trees": 250, "max_depth": 12 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::features::FillPolicy;
use crate::model::MaxFeatures;
use crate::vocabulary::VocabularyOrder;
use crate::{Error, Result};

/// Top-level configuration for one dataset build and model fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Feature extraction settings
    pub extraction: ExtractionConfig,
    /// Train/validation split settings
    pub split: SplitConfig,
    /// Random forest hyperparameters
    pub forest: ForestConfig,
}

/// Feature extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Column order of the area vocabulary
    pub vocabulary_order: VocabularyOrder,
    /// Value emitted for areas a session did not record
    pub fill_policy: FillPolicy,
    /// Dataset-wide time-bin count; inferred from the first trial when `None`
    pub time_bins: Option<usize>,
    /// Extract trials in parallel (requires the `rayon` feature)
    pub parallel: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            vocabulary_order: VocabularyOrder::Lexicographic,
            fill_policy: FillPolicy::Zero,
            time_bins: None,
            parallel: true,
        }
    }
}

/// Stratified split settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Share of each class routed to validation
    pub validation_fraction: f64,
    /// Shuffle seed
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            validation_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees
    pub n_trees: usize,
    /// Maximum tree depth (`None` = grow until pure or too small)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each child of a split
    pub min_samples_leaf: usize,
    /// Features considered per split
    pub max_features: MaxFeatures,
    /// Fit each tree on a bootstrap resample
    pub bootstrap: bool,
    /// Base seed; tree `i` uses `seed + i`
    pub seed: u64,
    /// Fit trees in parallel (requires the `rayon` feature)
    pub parallel: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid JSON, or holds
    /// out-of-range values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.extraction.time_bins == Some(0) {
            return Err(Error::Config(
                "extraction.time_bins must be at least 1".to_string(),
            ));
        }

        let fraction = self.split.validation_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(Error::Config(format!(
                "split.validation_fraction must be in (0, 1), got {fraction}"
            )));
        }

        self.forest.validate()
    }
}

impl ForestConfig {
    /// Check forest hyperparameter ranges.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(Error::Config("forest.n_trees must be at least 1".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(Error::Config(format!(
                "forest.min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(Error::Config(
                "forest.min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(Error::Config("forest.max_depth must be at least 1".to_string()));
        }
        self.max_features.validate()
    }
}
