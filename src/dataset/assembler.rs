//! Dataset assembly: run extraction over every trial of every session

use serde::Serialize;
use tracing::{debug, info, warn};

use super::Dataset;
use crate::config::ExtractionConfig;
use crate::error::Location;
use crate::features::{AreaGrouping, FeatureExtractor, FeatureVector, TimeWindows};
use crate::session::{Session, SessionStore};
use crate::vocabulary::AreaVocabulary;
use crate::{Error, Result};

/// Facts gathered while assembling a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    /// Sessions processed
    pub sessions: usize,
    /// Rows produced
    pub rows: usize,
    /// Successful trials
    pub successes: usize,
    /// Dataset-wide time-bin width (`None` when there were no trials)
    pub time_bins: Option<usize>,
    /// Trials whose early or late half was empty (rate defaulted to 0)
    pub degenerate_trials: usize,
}

/// Builds a [`Dataset`] from a session store and a frozen vocabulary.
#[derive(Debug, Clone, Default)]
pub struct DatasetAssembler {
    config: ExtractionConfig,
}

impl DatasetAssembler {
    /// Create an assembler.
    #[must_use]
    pub const fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extraction settings in use.
    #[must_use]
    pub const fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract every trial of every session, in session then trial order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Schema` if a trial's time-bin count differs from the
    /// dataset-wide width, or `Error::Vocabulary` if a session records an
    /// area missing from `vocabulary`. Either aborts the whole build.
    pub fn assemble<S>(&self, store: &S, vocabulary: &AreaVocabulary) -> Result<(Dataset, AssemblyStats)>
    where
        S: SessionStore + ?Sized,
    {
        let sessions = store.sessions();
        let extractor = FeatureExtractor::with_fill_policy(vocabulary, self.config.fill_policy);
        let time_bins = self.config.time_bins.or_else(|| first_bin_count(sessions));

        let mut rows = Vec::with_capacity(store.trial_count());
        for session in sessions {
            if let Some(bins) = time_bins {
                check_bin_width(session, bins)?;
            }
            let grouping = extractor.grouping(session)?;
            let session_rows = self.extract_session(&extractor, session, &grouping)?;
            debug!(
                session = session.id(),
                trials = session_rows.len(),
                recorded_areas = grouping.area_count(),
                "Extracted session"
            );
            rows.extend(session_rows);
        }

        let degenerate_trials = match time_bins {
            Some(bins) if TimeWindows::split(bins).is_degenerate() => {
                warn!(
                    time_bins = bins,
                    trials = rows.len(),
                    "Time window too short for an early/late split; empty half rates set to 0"
                );
                rows.len()
            }
            _ => 0,
        };

        let dataset = Dataset::new(vocabulary.clone(), rows)?;
        let stats = AssemblyStats {
            sessions: sessions.len(),
            rows: dataset.len(),
            successes: dataset.class_counts()[1],
            time_bins,
            degenerate_trials,
        };
        info!(
            rows = stats.rows,
            sessions = stats.sessions,
            features = dataset.schema().width(),
            success_rate = dataset.success_rate(),
            "Dataset assembled"
        );
        Ok((dataset, stats))
    }

    fn extract_session(
        &self,
        extractor: &FeatureExtractor<'_>,
        session: &Session,
        grouping: &AreaGrouping,
    ) -> Result<Vec<FeatureVector>> {
        let trials = 0..session.trials().len();

        #[cfg(feature = "rayon")]
        if self.config.parallel {
            use rayon::prelude::*;
            // indexed collect keeps trial order
            return trials
                .into_par_iter()
                .map(|i| extractor.extract_with(session, grouping, i))
                .collect();
        }

        trials
            .map(|i| extractor.extract_with(session, grouping, i))
            .collect()
    }
}

fn first_bin_count(sessions: &[Session]) -> Option<usize> {
    sessions
        .iter()
        .find_map(|s| s.trials().first())
        .map(|t| t.spikes().bins())
}

fn check_bin_width(session: &Session, bins: usize) -> Result<()> {
    for (index, trial) in session.trials().iter().enumerate() {
        let found = trial.spikes().bins();
        if found != bins {
            return Err(Error::schema(
                Location::trial(session.id(), index),
                format!("trial has {found} time bins, dataset width is {bins}"),
            ));
        }
    }
    Ok(())
}
