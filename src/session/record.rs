//! On-disk session records
//!
//! Field names follow the recording export (`mouseName`, `neuronArea`, ...).

use serde::{Deserialize, Serialize};

use super::{Contrast, Feedback, Session, SpikeMatrix, Trial};
use crate::error::Location;
use crate::{Error, Result};

/// Raw session as exported by the recording pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Explicit session id; assigned from load order when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u32>,
    /// Mouse name
    pub mouse_name: String,
    /// ISO date of the recording
    pub date_experiment: String,
    /// Area label per neuron
    pub neuron_area: Vec<String>,
    /// Trials in recording order
    pub trials: Vec<TrialRecord>,
}

/// Raw trial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRecord {
    /// Left contrast, one of {0, 0.25, 0.5, 1}
    pub contrast_left: f64,
    /// Right contrast, one of {0, 0.25, 0.5, 1}
    pub contrast_right: f64,
    /// +1 success, -1 failure
    pub feedback_type: i64,
    /// Spike counts, one row per neuron
    pub spikes: Vec<Vec<u32>>,
}

impl SessionRecord {
    /// Validate the record and convert it into a `Session`.
    ///
    /// `fallback_id` is used when the record carries no `sessionId`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Schema` for contrasts outside the stimulus set, a
    /// `feedbackType` other than ±1, ragged spike rows, or any error raised
    /// by [`SessionBuilder::build`](super::SessionBuilder::build).
    pub fn into_session(self, fallback_id: u32) -> Result<Session> {
        let id = self.session_id.unwrap_or(fallback_id);

        let trials = self
            .trials
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_trial(Location::trial(id, index)))
            .collect::<Result<Vec<_>>>()?;

        Session::builder(id, self.mouse_name, self.date_experiment)
            .neuron_areas(self.neuron_area)
            .trials(trials)
            .build()
    }
}

impl TrialRecord {
    fn into_trial(self, at: Location) -> Result<Trial> {
        let contrast = |value: f64, side: &str| {
            Contrast::from_value(value).ok_or_else(|| {
                Error::schema(at, format!("contrast{side} {value} is not one of 0, 0.25, 0.5, 1"))
            })
        };
        let contrast_left = contrast(self.contrast_left, "Left")?;
        let contrast_right = contrast(self.contrast_right, "Right")?;

        let feedback = Feedback::from_feedback_type(self.feedback_type).ok_or_else(|| {
            Error::schema(at, format!("feedbackType {} is not +1 or -1", self.feedback_type))
        })?;

        let spikes = SpikeMatrix::from_rows(self.spikes).map_err(|reason| Error::schema(at, reason))?;

        Ok(Trial::new(contrast_left, contrast_right, feedback, spikes))
    }
}
