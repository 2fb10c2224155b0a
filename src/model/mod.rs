//! Trial-outcome classifier
//!
//! A bagged ensemble of CART trees ("random forest"): every tree is grown on
//! a bootstrap resample of the training partition and inspects a random
//! subset of features at each split. Classes are left unbalanced on
//! purpose; with ~70% successful trials the majority vote favours success,
//! and the per-class recall in [`EvaluationReport`] makes that visible.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use neurotab::config::ForestConfig;
//! use neurotab::dataset::{Dataset, StratifiedSplit};
//! use neurotab::model::ModelTrainer;
//!
//! # fn run(dataset: &Dataset) -> neurotab::Result<()> {
//! let split = StratifiedSplit::default().split(dataset)?;
//! let model = ModelTrainer::new(ForestConfig::default()).fit(&split.training(dataset))?;
//! let report = model.evaluate(&split.validation(dataset))?;
//!
//! println!("accuracy {:.3}", report.accuracy);
//! for feature in model.feature_importance().top_k(5) {
//!     println!("{:>2}. {} {:.4}", feature.rank, feature.name, feature.score);
//! }
//! # Ok(())
//! # }
//! ```

mod importance;
mod metrics;
mod trainer;
mod tree;

pub use importance::{FeatureImportance, RankedFeature};
pub use metrics::{ConfusionMatrix, EvaluationReport};
pub use trainer::{ModelTrainer, TrainedModel};
pub use tree::{DecisionTree, FittedTree, TreeParams};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of features inspected per split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `floor(sqrt(p))`, at least 1
    #[default]
    Sqrt,
    /// All `p` features (plain bagging)
    All,
    /// `floor(fraction * p)`, at least 1
    Fraction(f64),
    /// A fixed count, capped at `p`
    Count(usize),
}

impl MaxFeatures {
    /// Resolve against `p` features; always in `1..=max(p, 1)`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn resolve(self, p: usize) -> usize {
        let n = match self {
            Self::Sqrt => (p as f64).sqrt().floor() as usize,
            Self::All => p,
            Self::Fraction(f) => (f * p as f64).floor() as usize,
            Self::Count(c) => c,
        };
        n.clamp(1, p.max(1))
    }

    /// Check the setting is usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a fraction outside (0, 1] or a zero count.
    pub fn validate(self) -> Result<()> {
        match self {
            Self::Fraction(f) if !(f > 0.0 && f <= 1.0) => Err(Error::Config(format!(
                "forest.max_features fraction must be in (0, 1], got {f}"
            ))),
            Self::Count(0) => Err(Error::Config(
                "forest.max_features count must be at least 1".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
