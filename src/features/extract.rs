//! Per-trial feature extraction

use serde::{Deserialize, Serialize};

use super::{AreaFeature, FeatureSchema, FeatureVector, NeuronActivity, TimeWindows};
use crate::error::Location;
use crate::session::Session;
use crate::vocabulary::AreaVocabulary;
use crate::{Error, Result};

/// Value emitted in the three slots of an area the session never recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Zero spikes, zero rate
    #[default]
    Zero,
    /// NaN; trees route missing values to the right child
    Missing,
}

impl FillPolicy {
    /// Fill value for absent areas.
    #[must_use]
    pub const fn fill_value(self) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::Missing => f64::NAN,
        }
    }
}

/// Neurons of one session grouped by vocabulary index.
///
/// Built once per session and reused for every trial of that session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaGrouping {
    session_id: u32,
    neurons: usize,
    groups: Vec<(usize, Vec<usize>)>,
}

impl AreaGrouping {
    /// Group a session's neurons by area.
    ///
    /// # Errors
    ///
    /// Returns `Error::Vocabulary` if a neuron's area is not in `vocabulary`.
    pub fn build(session: &Session, vocabulary: &AreaVocabulary) -> Result<Self> {
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); vocabulary.len()];
        for (neuron, area) in session.neuron_areas().iter().enumerate() {
            let column = vocabulary.index_of(area).ok_or_else(|| Error::Vocabulary {
                at: Location::session(session.id()),
                area: area.clone(),
            })?;
            members[column].push(neuron);
        }

        let groups = members
            .into_iter()
            .enumerate()
            .filter(|(_, neurons)| !neurons.is_empty())
            .collect();

        Ok(Self {
            session_id: session.id(),
            neurons: session.neuron_count(),
            groups,
        })
    }

    /// Session the grouping was built for.
    #[must_use]
    pub const fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Number of recorded areas.
    #[must_use]
    pub fn area_count(&self) -> usize {
        self.groups.len()
    }

    /// `(vocabulary index, neuron rows)` per recorded area, by vocabulary index.
    #[must_use]
    pub fn groups(&self) -> &[(usize, Vec<usize>)] {
        &self.groups
    }
}

/// Converts trials into feature vectors against a frozen vocabulary.
#[derive(Debug, Clone)]
pub struct FeatureExtractor<'v> {
    vocabulary: &'v AreaVocabulary,
    schema: FeatureSchema,
    fill: FillPolicy,
}

impl<'v> FeatureExtractor<'v> {
    /// Create an extractor with the default zero fill.
    #[must_use]
    pub fn new(vocabulary: &'v AreaVocabulary) -> Self {
        Self::with_fill_policy(vocabulary, FillPolicy::Zero)
    }

    /// Create an extractor with an explicit fill policy.
    #[must_use]
    pub fn with_fill_policy(vocabulary: &'v AreaVocabulary, fill: FillPolicy) -> Self {
        Self {
            vocabulary,
            schema: FeatureSchema::new(vocabulary),
            fill,
        }
    }

    /// The frozen vocabulary.
    #[must_use]
    pub const fn vocabulary(&self) -> &'v AreaVocabulary {
        self.vocabulary
    }

    /// Column layout of every vector this extractor produces.
    #[must_use]
    pub const fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Fill policy for unrecorded areas.
    #[must_use]
    pub const fn fill_policy(&self) -> FillPolicy {
        self.fill
    }

    /// Group a session's neurons against this extractor's vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `Error::Vocabulary` for an area missing from the vocabulary.
    pub fn grouping(&self, session: &Session) -> Result<AreaGrouping> {
        AreaGrouping::build(session, self.vocabulary)
    }

    /// Extract one trial, grouping the session's neurons on the fly.
    ///
    /// Prefer [`extract_with`](Self::extract_with) when extracting many
    /// trials of the same session.
    ///
    /// # Errors
    ///
    /// Returns `Error::Vocabulary` for unknown areas, or `Error::InvalidInput`
    /// if `trial_index` is out of range.
    pub fn extract(&self, session: &Session, trial_index: usize) -> Result<FeatureVector> {
        let grouping = self.grouping(session)?;
        self.extract_with(session, &grouping, trial_index)
    }

    /// Extract one trial using a prebuilt grouping.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `trial_index` is out of range or the
    /// grouping was built for a different session.
    pub fn extract_with(
        &self,
        session: &Session,
        grouping: &AreaGrouping,
        trial_index: usize,
    ) -> Result<FeatureVector> {
        if grouping.session_id != session.id() || grouping.neurons != session.neuron_count() {
            return Err(Error::InvalidInput(format!(
                "area grouping for session {} used with session {}",
                grouping.session_id,
                session.id()
            )));
        }
        let trial = session.trials().get(trial_index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "session {} has no trial {trial_index} ({} trials)",
                session.id(),
                session.trials().len()
            ))
        })?;

        let spikes = trial.spikes();
        let windows = TimeWindows::split(spikes.bins());
        let activity: Vec<NeuronActivity> = spikes
            .rows()
            .map(|row| NeuronActivity::measure(row, &windows))
            .collect();

        let mut values = vec![self.fill.fill_value(); self.schema.width()];
        values[0] = trial.contrast_left().value();
        values[1] = trial.contrast_right().value();

        for (area, neurons) in &grouping.groups {
            let mut total = 0u64;
            let mut early = 0.0;
            let mut late = 0.0;
            for &n in neurons {
                total += activity[n].total;
                early += activity[n].early_rate;
                late += activity[n].late_rate;
            }
            #[allow(clippy::cast_precision_loss)]
            let (count, total) = (neurons.len() as f64, total as f64);

            values[self.schema.column(AreaFeature::TotalSpikes, *area)] = total;
            values[self.schema.column(AreaFeature::EarlyRate, *area)] = early / count;
            values[self.schema.column(AreaFeature::LateRate, *area)] = late / count;
        }

        Ok(FeatureVector::new(
            session.id(),
            trial_index,
            trial.feedback(),
            values,
        ))
    }
}
