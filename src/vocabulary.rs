//! Global brain-area vocabulary
//!
//! Sessions record different neuron populations, so feature columns are
//! keyed by brain area rather than by neuron. The vocabulary is the union of
//! every area label across all sessions; its order fixes feature-column
//! identity for the lifetime of a dataset build.
//!
//! Ordering rules:
//! - [`VocabularyOrder::Lexicographic`] (default): byte-wise sorted labels.
//!   Independent of session order, so adding a session never reorders the
//!   columns of areas that already existed.
//! - [`VocabularyOrder::FirstSeen`]: first appearance scanning sessions in
//!   store order, neurons in row order.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::session::Session;

/// Column ordering rule for area labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyOrder {
    /// Sorted by label (byte-wise)
    #[default]
    Lexicographic,
    /// Order of first appearance across sessions
    FirstSeen,
}

/// Frozen, deduplicated, ordered set of area labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaVocabulary {
    labels: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl AreaVocabulary {
    /// Derive the vocabulary from every session's neuron-area list.
    ///
    /// An empty session set yields an empty vocabulary.
    #[must_use]
    pub fn build(sessions: &[Session], order: VocabularyOrder) -> Self {
        let mut seen = FxHashSet::default();
        let mut labels: Vec<String> = sessions
            .iter()
            .flat_map(|s| s.neuron_areas().iter())
            .filter(|label| seen.insert(label.as_str()))
            .cloned()
            .collect();

        if order == VocabularyOrder::Lexicographic {
            labels.sort_unstable();
        }

        let vocabulary = Self::from_ordered(labels);
        info!(
            areas = vocabulary.len(),
            sessions = sessions.len(),
            ?order,
            "Area vocabulary frozen"
        );
        vocabulary
    }

    /// Build a vocabulary from an explicit label list, keeping the first
    /// occurrence of each label in the given order.
    #[must_use]
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = FxHashSet::default();
        let labels = labels
            .into_iter()
            .map(Into::into)
            .filter(|label: &String| seen.insert(label.clone()))
            .collect();
        Self::from_ordered(labels)
    }

    fn from_ordered(labels: Vec<String>) -> Self {
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();
        Self { labels, index }
    }

    /// Number of areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if no areas were observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in column order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Column position of an area.
    #[must_use]
    pub fn index_of(&self, area: &str) -> Option<usize> {
        self.index.get(area).copied()
    }

    /// Check if an area is part of the vocabulary.
    #[must_use]
    pub fn contains(&self, area: &str) -> bool {
        self.index.contains_key(area)
    }

    /// Iterate over labels in column order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.labels.iter().map(String::as_str)
    }
}
