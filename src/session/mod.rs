//! Recording sessions and trials
//!
//! A [`Session`] is one recording day for one mouse: a fixed population of
//! neurons, each labelled with the brain area it was recorded from, and an
//! ordered list of [`Trial`]s. Sessions are validated on construction and
//! immutable afterwards.
//!
//! ## Usage
//!
//! ```rust
//! use neurotab::session::{Contrast, Feedback, Session, SpikeMatrix, Trial};
//!
//! let spikes = SpikeMatrix::from_rows(vec![vec![1, 0, 1, 0], vec![0, 0, 2, 1]]).unwrap();
//! let trial = Trial::new(Contrast::Quarter, Contrast::Full, Feedback::Success, spikes);
//!
//! let session = Session::builder(1, "Cori", "2016-12-14")
//!     .neuron_areas(["CA1", "root"])
//!     .trial(trial)
//!     .build()?;
//! assert_eq!(session.neuron_count(), 2);
//! # Ok::<(), neurotab::Error>(())
//! ```

mod record;
mod store;
mod summary;

pub use record::{SessionRecord, TrialRecord};
pub use store::{MemorySessionStore, SessionStore};
pub use summary::SessionSummary;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Location;
use crate::{Error, Result};

/// Visual stimulus contrast on one side of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Contrast {
    /// No stimulus
    Zero,
    /// 25% contrast
    Quarter,
    /// 50% contrast
    Half,
    /// 100% contrast
    Full,
}

impl Contrast {
    /// All contrast levels in ascending order.
    pub const LEVELS: [Self; 4] = [Self::Zero, Self::Quarter, Self::Half, Self::Full];

    /// Parse a recorded contrast value.
    ///
    /// Returns `None` for anything outside {0, 0.25, 0.5, 1}.
    #[must_use]
    pub fn from_value(value: f64) -> Option<Self> {
        Self::LEVELS
            .into_iter()
            .find(|level| (level.value() - value).abs() < 1e-9)
    }

    /// Numeric contrast.
    #[must_use]
    pub const fn value(self) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::Quarter => 0.25,
            Self::Half => 0.5,
            Self::Full => 1.0,
        }
    }
}

/// Trial outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feedback {
    /// Negative feedback (`feedbackType == -1`)
    Failure,
    /// Reward (`feedbackType == +1`)
    Success,
}

impl Feedback {
    /// Both outcomes, failure first.
    pub const ALL: [Self; 2] = [Self::Failure, Self::Success];

    /// Parse a recorded `feedbackType` (+1 / -1).
    #[must_use]
    pub const fn from_feedback_type(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Success),
            -1 => Some(Self::Failure),
            _ => None,
        }
    }

    /// Recorded `feedbackType` encoding.
    #[must_use]
    pub const fn feedback_type(self) -> i8 {
        match self {
            Self::Success => 1,
            Self::Failure => -1,
        }
    }

    /// Dense class index (failure = 0, success = 1).
    #[must_use]
    pub const fn class_index(self) -> usize {
        match self {
            Self::Failure => 0,
            Self::Success => 1,
        }
    }

    /// Inverse of [`class_index`](Self::class_index); any non-zero index is success.
    #[must_use]
    pub const fn from_class_index(index: usize) -> Self {
        if index == 0 {
            Self::Failure
        } else {
            Self::Success
        }
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Spike counts for one trial, neurons × time bins, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpikeMatrix {
    neurons: usize,
    bins: usize,
    counts: Vec<u32>,
}

impl SpikeMatrix {
    /// Build from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns the mismatch description if `counts.len() != neurons * bins`.
    pub fn new(neurons: usize, bins: usize, counts: Vec<u32>) -> std::result::Result<Self, String> {
        if counts.len() != neurons * bins {
            return Err(format!(
                "spike buffer holds {} counts, expected {neurons} x {bins}",
                counts.len()
            ));
        }
        Ok(Self {
            neurons,
            bins,
            counts,
        })
    }

    /// Build from one row per neuron.
    ///
    /// # Errors
    ///
    /// Returns the mismatch description if rows have different lengths.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> std::result::Result<Self, String> {
        let neurons = rows.len();
        let bins = rows.first().map_or(0, Vec::len);
        let mut counts = Vec::with_capacity(neurons * bins);
        for (neuron, row) in rows.into_iter().enumerate() {
            if row.len() != bins {
                return Err(format!(
                    "neuron {neuron} has {} time bins, neuron 0 has {bins}",
                    row.len()
                ));
            }
            counts.extend(row);
        }
        Ok(Self {
            neurons,
            bins,
            counts,
        })
    }

    /// Number of neurons (rows).
    #[must_use]
    pub const fn neurons(&self) -> usize {
        self.neurons
    }

    /// Number of time bins (columns).
    #[must_use]
    pub const fn bins(&self) -> usize {
        self.bins
    }

    /// Spike counts of one neuron across all bins.
    ///
    /// # Panics
    ///
    /// Panics if `neuron >= self.neurons()`.
    #[must_use]
    pub fn row(&self, neuron: usize) -> &[u32] {
        let start = neuron * self.bins;
        &self.counts[start..start + self.bins]
    }

    /// Iterate over neuron rows.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        // not chunks_exact: zero-bin matrices still yield one empty row per neuron
        (0..self.neurons).map(move |n| self.row(n))
    }

    /// Total spikes across the whole matrix.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

/// One stimulus-response episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    contrast_left: Contrast,
    contrast_right: Contrast,
    feedback: Feedback,
    spikes: SpikeMatrix,
}

impl Trial {
    /// Create a trial.
    #[must_use]
    pub const fn new(
        contrast_left: Contrast,
        contrast_right: Contrast,
        feedback: Feedback,
        spikes: SpikeMatrix,
    ) -> Self {
        Self {
            contrast_left,
            contrast_right,
            feedback,
            spikes,
        }
    }

    /// Left stimulus contrast.
    #[must_use]
    pub const fn contrast_left(&self) -> Contrast {
        self.contrast_left
    }

    /// Right stimulus contrast.
    #[must_use]
    pub const fn contrast_right(&self) -> Contrast {
        self.contrast_right
    }

    /// Trial outcome.
    #[must_use]
    pub const fn feedback(&self) -> Feedback {
        self.feedback
    }

    /// Spike counts (neurons × bins).
    #[must_use]
    pub const fn spikes(&self) -> &SpikeMatrix {
        &self.spikes
    }
}

/// One recording session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: u32,
    mouse_name: String,
    date_experiment: NaiveDate,
    neuron_areas: Vec<String>,
    trials: Vec<Trial>,
}

impl Session {
    /// Start building a session; `date_experiment` is an ISO date (`YYYY-MM-DD`).
    #[must_use]
    pub fn builder(
        id: u32,
        mouse_name: impl Into<String>,
        date_experiment: impl Into<String>,
    ) -> SessionBuilder {
        SessionBuilder::new(id, mouse_name, date_experiment)
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Mouse name.
    #[must_use]
    pub fn mouse_name(&self) -> &str {
        &self.mouse_name
    }

    /// Experiment date.
    #[must_use]
    pub const fn date_experiment(&self) -> NaiveDate {
        self.date_experiment
    }

    /// Area label of each neuron, in row order.
    #[must_use]
    pub fn neuron_areas(&self) -> &[String] {
        &self.neuron_areas
    }

    /// Number of recorded neurons.
    #[must_use]
    pub fn neuron_count(&self) -> usize {
        self.neuron_areas.len()
    }

    /// Trials in recording order.
    #[must_use]
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }
}

/// Builder for `Session`.
#[derive(Debug)]
pub struct SessionBuilder {
    id: u32,
    mouse_name: String,
    date_experiment: String,
    neuron_areas: Vec<String>,
    trials: Vec<Trial>,
}

impl SessionBuilder {
    /// Create a builder with the required identity fields.
    #[must_use]
    pub fn new(id: u32, mouse_name: impl Into<String>, date_experiment: impl Into<String>) -> Self {
        Self {
            id,
            mouse_name: mouse_name.into(),
            date_experiment: date_experiment.into(),
            neuron_areas: Vec::new(),
            trials: Vec::new(),
        }
    }

    /// Set the per-neuron area labels.
    #[must_use]
    pub fn neuron_areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.neuron_areas = areas.into_iter().map(Into::into).collect();
        self
    }

    /// Append a trial.
    #[must_use]
    pub fn trial(mut self, trial: Trial) -> Self {
        self.trials.push(trial);
        self
    }

    /// Append several trials.
    #[must_use]
    pub fn trials(mut self, trials: impl IntoIterator<Item = Trial>) -> Self {
        self.trials.extend(trials);
        self
    }

    /// Validate and build the `Session`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Schema` if the date is not an ISO date or a trial's
    /// spike matrix row count differs from the neuron-area list length.
    pub fn build(self) -> Result<Session> {
        let date_experiment = NaiveDate::parse_from_str(&self.date_experiment, "%Y-%m-%d")
            .map_err(|e| {
                Error::schema(
                    Location::session(self.id),
                    format!("dateExperiment '{}' is not an ISO date: {e}", self.date_experiment),
                )
            })?;

        let neurons = self.neuron_areas.len();
        for (index, trial) in self.trials.iter().enumerate() {
            if trial.spikes.neurons() != neurons {
                return Err(Error::schema(
                    Location::trial(self.id, index),
                    format!(
                        "spike matrix has {} rows but the session lists {neurons} neuron areas",
                        trial.spikes.neurons()
                    ),
                ));
            }
        }

        Ok(Session {
            id: self.id,
            mouse_name: self.mouse_name,
            date_experiment,
            neuron_areas: self.neuron_areas,
            trials: self.trials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(rows: Vec<Vec<u32>>) -> Trial {
        Trial::new(
            Contrast::Zero,
            Contrast::Half,
            Feedback::Failure,
            SpikeMatrix::from_rows(rows).unwrap(),
        )
    }

    #[test]
    fn test_contrast_from_value() {
        assert_eq!(Contrast::from_value(0.25), Some(Contrast::Quarter));
        assert_eq!(Contrast::from_value(1.0), Some(Contrast::Full));
        assert_eq!(Contrast::from_value(0.3), None);
    }

    #[test]
    fn test_feedback_encoding() {
        assert_eq!(Feedback::from_feedback_type(1), Some(Feedback::Success));
        assert_eq!(Feedback::from_feedback_type(-1), Some(Feedback::Failure));
        assert_eq!(Feedback::from_feedback_type(0), None);
        assert_eq!(Feedback::Failure.feedback_type(), -1);
        assert_eq!(Feedback::from_class_index(Feedback::Success.class_index()), Feedback::Success);
    }

    #[test]
    fn test_spike_matrix_rows() {
        let m = SpikeMatrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(m.neurons(), 2);
        assert_eq!(m.bins(), 3);
        assert_eq!(m.row(1), &[4, 5, 6]);
        assert_eq!(m.total(), 21);
        assert_eq!(m.rows().count(), 2);
    }

    #[test]
    fn test_spike_matrix_ragged_rejected() {
        let err = SpikeMatrix::from_rows(vec![vec![1, 2], vec![3]]).unwrap_err();
        assert!(err.contains("neuron 1"));
    }

    #[test]
    fn test_spike_matrix_zero_bins() {
        let m = SpikeMatrix::new(3, 0, vec![]).unwrap();
        assert_eq!(m.rows().count(), 3);
        assert!(m.row(2).is_empty());
    }

    #[test]
    fn test_session_row_mismatch_is_schema_error() {
        let result = Session::builder(4, "Lederberg", "2017-12-05")
            .neuron_areas(["CA1", "CA1", "root"])
            .trial(trial(vec![vec![0, 1], vec![1, 0], vec![0, 0]]))
            .trial(trial(vec![vec![0, 1], vec![1, 0]]))
            .build();

        match result {
            Err(Error::Schema { at, .. }) => {
                assert_eq!(at, Location::trial(4, 1));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_session_bad_date() {
        let result = Session::builder(1, "Cori", "14/12/2016").build();
        assert!(matches!(result, Err(Error::Schema { .. })));
    }
}
