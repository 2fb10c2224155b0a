//! Assembled feature table and train/validation partitions
//!
//! ```text
//! SessionStore ──> AreaVocabulary (frozen) ──> FeatureExtractor (per trial)
//!                                                   │
//!                                  DatasetAssembler ┘──> Dataset ──> Split
//!                                                                    ├── training: Partition
//!                                                                    └── validation: Partition
//! ```
//!
//! A `Dataset` is append-free after construction: rows are ordered by
//! session (store order) then trial index, and partitions are read-only
//! index views over it.

mod assembler;
mod split;

pub use assembler::{AssemblyStats, DatasetAssembler};
pub use split::{Partition, Split, StratifiedSplit};

use crate::features::{FeatureSchema, FeatureVector};
use crate::session::Feedback;
use crate::vocabulary::AreaVocabulary;
use crate::{Error, Result};

/// Ordered feature rows from all sessions, with their column layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    vocabulary: AreaVocabulary,
    schema: FeatureSchema,
    rows: Vec<FeatureVector>,
}

impl Dataset {
    /// Build a dataset from rows laid out for `vocabulary`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if any row's width differs from
    /// `2 + 3 * vocabulary.len()`.
    pub fn new(vocabulary: AreaVocabulary, rows: Vec<FeatureVector>) -> Result<Self> {
        let schema = FeatureSchema::new(&vocabulary);
        if let Some(row) = rows.iter().find(|r| r.len() != schema.width()) {
            return Err(Error::InvalidInput(format!(
                "row for session {}, trial {} has {} features, schema has {}",
                row.session_id(),
                row.trial_index(),
                row.len(),
                schema.width()
            )));
        }
        Ok(Self {
            vocabulary,
            schema,
            rows,
        })
    }

    /// Area vocabulary the columns are keyed to.
    #[must_use]
    pub const fn vocabulary(&self) -> &AreaVocabulary {
        &self.vocabulary
    }

    /// Column layout.
    #[must_use]
    pub const fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// All rows in dataset order.
    #[must_use]
    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    /// Number of rows (trials).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row counts per class, indexed by [`Feedback::class_index`].
    #[must_use]
    pub fn class_counts(&self) -> [usize; 2] {
        class_counts(self.rows.iter())
    }

    /// Share of successful trials (0 for an empty dataset).
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        success_rate(self.class_counts())
    }

    /// Read-only view over the rows at `indices`.
    ///
    /// # Panics
    ///
    /// Iterating the partition panics if an index is out of range.
    #[must_use]
    pub fn partition<'a>(&'a self, indices: &'a [usize]) -> Partition<'a> {
        Partition::new(self, indices)
    }
}

pub(crate) fn class_counts<'a>(rows: impl Iterator<Item = &'a FeatureVector>) -> [usize; 2] {
    let mut counts = [0; 2];
    for row in rows {
        counts[row.feedback().class_index()] += 1;
    }
    counts
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn success_rate(counts: [usize; 2]) -> f64 {
    let total = counts[0] + counts[1];
    if total == 0 {
        0.0
    } else {
        counts[Feedback::Success.class_index()] as f64 / total as f64
    }
}
