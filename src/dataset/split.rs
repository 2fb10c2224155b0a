//! Label-stratified train/validation split

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use super::{class_counts, success_rate, Dataset};
use crate::config::SplitConfig;
use crate::features::FeatureVector;
use crate::session::Feedback;
use crate::{Error, Result};

/// Seeded, label-stratified splitter.
///
/// Each class is shuffled independently and `round(n_class * fraction)` of
/// its rows go to validation, so both partitions keep the dataset's
/// success/failure ratio up to rounding. The same seed and input order
/// always give the same split.
#[derive(Debug, Clone, PartialEq)]
pub struct StratifiedSplit {
    validation_fraction: f64,
    seed: u64,
}

impl Default for StratifiedSplit {
    fn default() -> Self {
        Self::from_config(&SplitConfig::default())
    }
}

impl StratifiedSplit {
    /// Create a splitter.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `validation_fraction` is not in (0, 1).
    pub fn new(validation_fraction: f64, seed: u64) -> Result<Self> {
        if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
            return Err(Error::Config(format!(
                "validation fraction must be in (0, 1), got {validation_fraction}"
            )));
        }
        Ok(Self {
            validation_fraction,
            seed,
        })
    }

    /// Create a splitter from already validated settings.
    #[must_use]
    pub const fn from_config(config: &SplitConfig) -> Self {
        Self {
            validation_fraction: config.validation_fraction,
            seed: config.seed,
        }
    }

    /// Split a dataset into training and validation row indices.
    ///
    /// # Errors
    ///
    /// Returns `Error::Split` if the dataset has fewer than 2 rows or only
    /// one label class.
    pub fn split(&self, dataset: &Dataset) -> Result<Split> {
        if dataset.len() < 2 {
            return Err(Error::Split(format!(
                "cannot stratify a dataset with {} trial(s); at least 2 are required",
                dataset.len()
            )));
        }
        let counts = dataset.class_counts();
        if let Some(present) = Feedback::ALL.into_iter().find(|c| counts[c.class_index()] == dataset.len()) {
            return Err(Error::Split(format!(
                "cannot stratify a single-class dataset (all {} trials are {present})",
                dataset.len()
            )));
        }

        let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        for (i, row) in dataset.rows().iter().enumerate() {
            by_class[row.feedback().class_index()].push(i);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut training = Vec::with_capacity(dataset.len());
        let mut validation = Vec::new();
        let mut cut = [0usize; 2];

        for (class, indices) in by_class.iter_mut().enumerate() {
            indices.shuffle(&mut rng);
            cut[class] = self.validation_count(indices.len());
        }

        // Rounding can empty a partition on tiny datasets; borrow one row
        // from the larger class.
        let larger = usize::from(by_class[1].len() >= by_class[0].len());
        if cut[0] + cut[1] == 0 {
            cut[larger] = 1;
        } else if cut[0] + cut[1] == dataset.len() {
            cut[larger] -= 1;
        }

        for (class, indices) in by_class.iter().enumerate() {
            validation.extend_from_slice(&indices[..cut[class]]);
            training.extend_from_slice(&indices[cut[class]..]);
        }
        training.sort_unstable();
        validation.sort_unstable();

        let split = Split {
            training,
            validation,
        };
        info!(
            seed = self.seed,
            training = split.training.len(),
            validation = split.validation.len(),
            training_success_rate = split.training(dataset).success_rate(),
            validation_success_rate = split.validation(dataset).success_rate(),
            "Stratified split"
        );
        Ok(split)
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn validation_count(&self, class_size: usize) -> usize {
        let n = (class_size as f64 * self.validation_fraction).round() as usize;
        n.min(class_size)
    }
}

/// Disjoint training/validation row indices, each ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    training: Vec<usize>,
    validation: Vec<usize>,
}

impl Split {
    /// Training row indices.
    #[must_use]
    pub fn training_indices(&self) -> &[usize] {
        &self.training
    }

    /// Validation row indices.
    #[must_use]
    pub fn validation_indices(&self) -> &[usize] {
        &self.validation
    }

    /// Training view over `dataset`.
    #[must_use]
    pub fn training<'a>(&'a self, dataset: &'a Dataset) -> Partition<'a> {
        dataset.partition(&self.training)
    }

    /// Validation view over `dataset`.
    #[must_use]
    pub fn validation<'a>(&'a self, dataset: &'a Dataset) -> Partition<'a> {
        dataset.partition(&self.validation)
    }
}

/// Read-only view over a subset of dataset rows.
#[derive(Debug, Clone, Copy)]
pub struct Partition<'a> {
    dataset: &'a Dataset,
    indices: &'a [usize],
}

impl<'a> Partition<'a> {
    pub(super) const fn new(dataset: &'a Dataset, indices: &'a [usize]) -> Self {
        Self { dataset, indices }
    }

    /// Underlying dataset.
    #[must_use]
    pub const fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Row indices into the dataset.
    #[must_use]
    pub const fn indices(&self) -> &'a [usize] {
        self.indices
    }

    /// Number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if the partition is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Rows in dataset order.
    pub fn rows(&self) -> impl Iterator<Item = &'a FeatureVector> + 'a {
        let rows = self.dataset.rows();
        self.indices.iter().map(move |&i| &rows[i])
    }

    /// Row counts per class, indexed by [`Feedback::class_index`].
    #[must_use]
    pub fn class_counts(&self) -> [usize; 2] {
        class_counts(self.rows())
    }

    /// Share of successful trials.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        success_rate(self.class_counts())
    }
}
