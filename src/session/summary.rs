//! Per-session overview statistics

use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use serde::Serialize;

use super::{Feedback, Session};

/// Overview of one session's recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Session id
    pub session_id: u32,
    /// Mouse name
    pub mouse_name: String,
    /// Experiment date
    pub date_experiment: NaiveDate,
    /// Recorded neurons
    pub neurons: usize,
    /// Distinct brain areas
    pub areas: usize,
    /// Trial count
    pub trials: usize,
    /// Share of successful trials (0 when the session has no trials)
    pub success_rate: f64,
    /// Mean spikes per bin, averaged over neurons then trials
    pub mean_firing_rate: f64,
}

impl SessionSummary {
    /// Summarize a session.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_session(session: &Session) -> Self {
        let areas: FxHashSet<&str> = session.neuron_areas().iter().map(String::as_str).collect();
        let trials = session.trials();

        let successes = trials
            .iter()
            .filter(|t| t.feedback() == Feedback::Success)
            .count();

        let trial_rates: f64 = trials
            .iter()
            .map(|trial| {
                let spikes = trial.spikes();
                let cells = spikes.neurons() * spikes.bins();
                if cells == 0 {
                    return 0.0;
                }
                // mean over neurons of (row total / bins)
                spikes.total() as f64 / cells as f64
            })
            .sum();

        let per_trial = |value: f64| {
            if trials.is_empty() {
                0.0
            } else {
                value / trials.len() as f64
            }
        };

        Self {
            session_id: session.id(),
            mouse_name: session.mouse_name().to_string(),
            date_experiment: session.date_experiment(),
            neurons: session.neuron_count(),
            areas: areas.len(),
            trials: trials.len(),
            success_rate: per_trial(successes as f64),
            mean_firing_rate: per_trial(trial_rates),
        }
    }
}
