//! Feature vector - one row of the assembled table

use crate::session::Feedback;

/// Fixed-width numeric summary of one trial.
///
/// `values` follows the [`FeatureSchema`](super::FeatureSchema) layout.
/// The label and the owning session id ride alongside and are never part
/// of the model input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    session_id: u32,
    trial_index: usize,
    feedback: Feedback,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Create a feature vector.
    #[must_use]
    pub const fn new(session_id: u32, trial_index: usize, feedback: Feedback, values: Vec<f64>) -> Self {
        Self {
            session_id,
            trial_index,
            feedback,
            values,
        }
    }

    /// Owning session id.
    #[must_use]
    pub const fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Trial position within its session.
    #[must_use]
    pub const fn trial_index(&self) -> usize {
        self.trial_index
    }

    /// Trial outcome (the label).
    #[must_use]
    pub const fn feedback(&self) -> Feedback {
        self.feedback
    }

    /// Model-input feature values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of feature values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the vector has no feature values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a column position.
    #[must_use]
    pub fn get(&self, column: usize) -> Option<f64> {
        self.values.get(column).copied()
    }
}
