//! Validation metrics

use std::fmt;

use serde::Serialize;

use super::RankedFeature;
use crate::session::Feedback;
use crate::Result;

/// 2×2 confusion matrix over {failure, success}.
///
/// `counts[actual][predicted]`, indexed by [`Feedback::class_index`].
/// Success is the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Empty matrix.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counts: [[0; 2]; 2],
        }
    }

    /// Tally `(actual, predicted)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Feedback, Feedback)>) -> Self {
        let mut matrix = Self::new();
        for (actual, predicted) in pairs {
            matrix.record(actual, predicted);
        }
        matrix
    }

    /// Add one outcome.
    pub fn record(&mut self, actual: Feedback, predicted: Feedback) {
        self.counts[actual.class_index()][predicted.class_index()] += 1;
    }

    /// Count of trials with this actual and predicted class.
    #[must_use]
    pub const fn get(&self, actual: Feedback, predicted: Feedback) -> usize {
        self.counts[actual.class_index()][predicted.class_index()]
    }

    /// Successes predicted as success.
    #[must_use]
    pub const fn true_positives(&self) -> usize {
        self.get(Feedback::Success, Feedback::Success)
    }

    /// Failures predicted as failure.
    #[must_use]
    pub const fn true_negatives(&self) -> usize {
        self.get(Feedback::Failure, Feedback::Failure)
    }

    /// Failures predicted as success.
    #[must_use]
    pub const fn false_positives(&self) -> usize {
        self.get(Feedback::Failure, Feedback::Success)
    }

    /// Successes predicted as failure.
    #[must_use]
    pub const fn false_negatives(&self) -> usize {
        self.get(Feedback::Success, Feedback::Failure)
    }

    /// Total tallied trials.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.counts[0][0] + self.counts[0][1] + self.counts[1][0] + self.counts[1][1]
    }

    /// `(TP + TN) / total`; 0 for an empty matrix.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.true_positives() + self.true_negatives()) as f64 / total as f64
        }
    }

    /// Share of `class` trials predicted as `class`; `None` if none occurred.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn recall(&self, class: Feedback) -> Option<f64> {
        let row = self.counts[class.class_index()];
        let actual = row[0] + row[1];
        (actual > 0).then(|| row[class.class_index()] as f64 / actual as f64)
    }

    /// Share of `class` predictions that were correct; `None` if never predicted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn precision(&self, class: Feedback) -> Option<f64> {
        let c = class.class_index();
        let predicted = self.counts[0][c] + self.counts[1][c];
        (predicted > 0).then(|| self.counts[c][c] as f64 / predicted as f64)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>16} {:>9} {:>9}", "actual\\predicted", "failure", "success")?;
        for actual in Feedback::ALL {
            writeln!(
                f,
                "{:>16} {:>9} {:>9}",
                actual.to_string(),
                self.get(actual, Feedback::Failure),
                self.get(actual, Feedback::Success)
            )?;
        }
        Ok(())
    }
}

/// Validation results of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// `(TP + TN) / total` on the validation partition
    pub accuracy: f64,
    /// Validation confusion matrix
    pub confusion: ConfusionMatrix,
    /// Recall on successful trials
    pub recall_success: Option<f64>,
    /// Recall on failed trials
    pub recall_failure: Option<f64>,
    /// Features ranked by importance
    pub importance: Vec<RankedFeature>,
    /// Rows the model was fitted on
    pub training_rows: usize,
    /// Rows scored
    pub validation_rows: usize,
}

impl EvaluationReport {
    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
