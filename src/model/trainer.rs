//! Random forest training and scoring

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::tree::{DecisionTree, FittedTree, TreeParams};
use super::{ConfusionMatrix, EvaluationReport, FeatureImportance};
use crate::config::ForestConfig;
use crate::dataset::Partition;
use crate::features::FeatureVector;
use crate::session::Feedback;
use crate::{Error, Result};

/// Fits bagged Gini trees on a training partition.
///
/// Only the feature values of each row are used as predictors; the label
/// and the session id never enter the model.
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: ForestConfig,
}

impl ModelTrainer {
    /// Create a trainer.
    #[must_use]
    pub const fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    /// Forest settings in use.
    #[must_use]
    pub const fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Fit a forest on `training`.
    ///
    /// Tree `i` draws its bootstrap sample and split features from a
    /// generator seeded with `seed + i`, so the result does not depend on
    /// whether trees are fitted in parallel.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for invalid hyperparameters, or `Error::Split`
    /// if the partition is empty or holds a single class.
    pub fn fit(&self, training: &Partition<'_>) -> Result<TrainedModel> {
        self.config.validate()?;
        if training.is_empty() {
            return Err(Error::Split("training partition is empty".to_string()));
        }
        let counts = training.class_counts();
        if counts[0] == 0 || counts[1] == 0 {
            return Err(Error::Split(format!(
                "training partition holds a single class ({} failure, {} success)",
                counts[0], counts[1]
            )));
        }

        let rows: Vec<&FeatureVector> = training.rows().collect();
        let x: Vec<&[f64]> = rows.iter().map(|r| r.values()).collect();
        let y: Vec<usize> = rows.iter().map(|r| r.feedback().class_index()).collect();
        let schema = training.dataset().schema();
        let width = schema.width();

        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: self.config.max_features.resolve(width),
        };

        let fitted = self.fit_trees(&x, &y, params);

        let mut scores = vec![0.0; width];
        let mut trees = Vec::with_capacity(fitted.len());
        for FittedTree {
            tree,
            impurity_decrease,
        } in fitted
        {
            let total: f64 = impurity_decrease.iter().sum();
            if total > 0.0 {
                for (score, decrease) in scores.iter_mut().zip(&impurity_decrease) {
                    *score += decrease / total;
                }
            }
            trees.push(tree);
        }
        let total: f64 = scores.iter().sum();
        if total > 0.0 {
            scores.iter_mut().for_each(|s| *s /= total);
        }

        let majority = if counts[1] >= counts[0] {
            Feedback::Success
        } else {
            Feedback::Failure
        };
        info!(
            trees = trees.len(),
            rows = x.len(),
            features = width,
            max_features = params.max_features,
            "Random forest fitted"
        );

        Ok(TrainedModel {
            trees,
            importance: FeatureImportance::new(schema.names().to_vec(), scores),
            majority,
            training_rows: x.len(),
        })
    }

    fn fit_trees(&self, x: &[&[f64]], y: &[usize], params: TreeParams) -> Vec<FittedTree> {
        let fit_one = |i: usize| {
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(i as u64));
            let n = x.len();
            let samples: Vec<usize> = if self.config.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            let fitted = DecisionTree::fit(x, y, samples, params, &mut rng);
            debug!(
                tree = i,
                nodes = fitted.tree.node_count(),
                leaves = fitted.tree.leaf_count(),
                "Tree fitted"
            );
            fitted
        };

        #[cfg(feature = "rayon")]
        if self.config.parallel {
            use rayon::prelude::*;
            return (0..self.config.n_trees).into_par_iter().map(fit_one).collect();
        }

        (0..self.config.n_trees).map(fit_one).collect()
    }
}

/// A fitted forest: immutable, derived only from its training partition.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    trees: Vec<DecisionTree>,
    importance: FeatureImportance,
    majority: Feedback,
    training_rows: usize,
}

impl TrainedModel {
    /// Number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Rows the forest was fitted on.
    #[must_use]
    pub const fn training_rows(&self) -> usize {
        self.training_rows
    }

    /// Predictor column names, in input order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        self.importance.names()
    }

    /// Mean-decrease-in-impurity score per feature.
    #[must_use]
    pub const fn feature_importance(&self) -> &FeatureImportance {
        &self.importance
    }

    /// Share of trees voting success.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `row` has the wrong width.
    #[allow(clippy::cast_precision_loss)]
    pub fn predict_proba(&self, row: &[f64]) -> Result<f64> {
        Ok(self.success_votes(row)? as f64 / self.trees.len() as f64)
    }

    /// Majority vote of the trees; a tied vote goes to the class that was
    /// more frequent in training.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `row` has the wrong width.
    pub fn predict(&self, row: &[f64]) -> Result<Feedback> {
        let votes = self.success_votes(row)? * 2;
        let n = self.trees.len();
        Ok(match votes.cmp(&n) {
            std::cmp::Ordering::Greater => Feedback::Success,
            std::cmp::Ordering::Less => Feedback::Failure,
            std::cmp::Ordering::Equal => self.majority,
        })
    }

    /// Score a validation partition.
    ///
    /// # Errors
    ///
    /// Returns `Error::Split` if `validation` is empty, or
    /// `Error::InvalidInput` if its rows have the wrong width.
    pub fn evaluate(&self, validation: &Partition<'_>) -> Result<EvaluationReport> {
        if validation.is_empty() {
            return Err(Error::Split("validation partition is empty".to_string()));
        }

        let mut confusion = ConfusionMatrix::new();
        for row in validation.rows() {
            confusion.record(row.feedback(), self.predict(row.values())?);
        }

        let report = EvaluationReport {
            accuracy: confusion.accuracy(),
            confusion,
            recall_success: confusion.recall(Feedback::Success),
            recall_failure: confusion.recall(Feedback::Failure),
            importance: self.importance.ranked(),
            training_rows: self.training_rows,
            validation_rows: validation.len(),
        };
        info!(
            accuracy = report.accuracy,
            recall_success = ?report.recall_success,
            recall_failure = ?report.recall_failure,
            rows = report.validation_rows,
            "Validation scored"
        );
        Ok(report)
    }

    fn success_votes(&self, row: &[f64]) -> Result<usize> {
        let width = self.importance.len();
        if row.len() != width {
            return Err(Error::InvalidInput(format!(
                "feature row has {} values, model expects {width}",
                row.len()
            )));
        }
        Ok(self
            .trees
            .iter()
            .filter(|t| t.predict(row) == Feedback::Success)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::vocabulary::AreaVocabulary;

    /// Rows where `total_spikes.CA1` separates the classes.
    fn separable() -> Dataset {
        let rows = (0..40)
            .map(|i| {
                let success = i % 3 != 0;
                let feedback = if success { Feedback::Success } else { Feedback::Failure };
                let signal = if success { 20.0 } else { 2.0 } + f64::from(i % 5);
                FeatureVector::new(1, i as usize, feedback, vec![0.5, 0.0, signal, 0.1, 0.1])
            })
            .collect();
        Dataset::new(AreaVocabulary::from_labels(["CA1"]), rows).unwrap()
    }

    fn config() -> ForestConfig {
        ForestConfig {
            n_trees: 15,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_fit_and_predict() {
        let data = separable();
        let all: Vec<usize> = (0..data.len()).collect();
        let model = ModelTrainer::new(config()).fit(&data.partition(&all)).unwrap();

        assert_eq!(model.n_trees(), 15);
        assert_eq!(model.predict(&[0.5, 0.0, 22.0, 0.1, 0.1]).unwrap(), Feedback::Success);
        assert_eq!(model.predict(&[0.5, 0.0, 3.0, 0.1, 0.1]).unwrap(), Feedback::Failure);

        let imp = model.feature_importance();
        assert!(imp.scores().iter().all(|&s| s >= 0.0));
        assert!((imp.scores().iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(imp.ranked()[0].name, "total_spikes.CA1");
        assert!(!model.feature_names().iter().any(|n| n == "session_id"));
    }

    #[test]
    fn test_wrong_width_rejected() {
        let data = separable();
        let all: Vec<usize> = (0..data.len()).collect();
        let model = ModelTrainer::new(config()).fit(&data.partition(&all)).unwrap();
        assert!(matches!(model.predict(&[1.0, 2.0]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_single_class_training_rejected() {
        let data = separable();
        let successes: Vec<usize> = (0..data.len()).filter(|i| i % 3 != 0).collect();
        let result = ModelTrainer::new(config()).fit(&data.partition(&successes));
        assert!(matches!(result, Err(Error::Split(_))));
    }

    #[test]
    fn test_fit_is_reproducible() {
        let data = separable();
        let all: Vec<usize> = (0..data.len()).collect();
        let sequential = ForestConfig {
            parallel: false,
            ..config()
        };
        let a = ModelTrainer::new(config()).fit(&data.partition(&all)).unwrap();
        let b = ModelTrainer::new(sequential).fit(&data.partition(&all)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_evaluate() {
        let data = separable();
        let train: Vec<usize> = (0..30).collect();
        let val: Vec<usize> = (30..40).collect();
        let model = ModelTrainer::new(config()).fit(&data.partition(&train)).unwrap();
        let report = model.evaluate(&data.partition(&val)).unwrap();

        assert_eq!(report.validation_rows, 10);
        assert_eq!(report.training_rows, 30);
        assert_eq!(report.confusion.total(), 10);
        assert!((report.accuracy - 1.0).abs() < f64::EPSILON);
        assert_eq!(report.importance.len(), 5);
        assert!(report.to_json_pretty().unwrap().contains("\"accuracy\""));
    }

    #[test]
    fn test_importance_never_negative() {
        // the f0 = 1 rows split by f1 keep a 2:1 class mix on both sides
        let mut rows = Vec::new();
        for (f0, f1, failures, successes) in [(0.0, 0.0, 3, 0), (1.0, 0.0, 2, 1), (1.0, 1.0, 8, 4)] {
            let labels = std::iter::repeat(Feedback::Failure)
                .take(failures)
                .chain(std::iter::repeat(Feedback::Success).take(successes));
            for feedback in labels {
                let i = rows.len();
                rows.push(FeatureVector::new(1, i, feedback, vec![f0, f1]));
            }
        }
        let data = Dataset::new(AreaVocabulary::from_labels(Vec::<String>::new()), rows).unwrap();
        let all: Vec<usize> = (0..data.len()).collect();
        let single = ForestConfig {
            n_trees: 1,
            bootstrap: false,
            max_features: crate::model::MaxFeatures::All,
            ..ForestConfig::default()
        };
        let model = ModelTrainer::new(single).fit(&data.partition(&all)).unwrap();
        let scores = model.feature_importance().scores();

        assert!(scores.iter().all(|&s| s >= 0.0), "{scores:?}");
        assert!((scores[0] - 1.0).abs() < 1e-12);
        assert!((scores[1] - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let data = separable();
        let all: Vec<usize> = (0..data.len()).collect();
        let bad = ForestConfig {
            min_samples_split: 1,
            ..config()
        };
        assert!(matches!(
            ModelTrainer::new(bad).fit(&data.partition(&all)),
            Err(Error::Config(_))
        ));
    }
}
