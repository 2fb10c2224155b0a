//! # neurotab: Multi-Session Neural Feature Tables
//!
//! **Version**: 0.1.0
//!
//! neurotab turns heterogeneous spike-count recordings (many sessions, each
//! with its own neuron set and brain-area labels) into one column-aligned
//! feature table, then trains and scores a random-forest classifier of
//! trial outcome on it.
//!
//! ## Stages
//!
//! 1. [`AreaVocabulary`](vocabulary::AreaVocabulary): ordered union of area labels, frozen
//! 2. [`FeatureExtractor`](features::FeatureExtractor): one fixed-width row per trial
//! 3. [`DatasetAssembler`](dataset::DatasetAssembler) and
//!    [`StratifiedSplit`](dataset::StratifiedSplit): the table, then a
//!    class-preserving training/validation split
//! 4. [`ModelTrainer`](model::ModelTrainer): random forest, validation metrics,
//!    feature importance
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use neurotab::session::MemorySessionStore;
//! use neurotab::Pipeline;
//!
//! let store = MemorySessionStore::load_json_dir("data/sessions")?;
//! let pipeline = Pipeline::builder().seed(7).trees(200).build()?;
//! let output = pipeline.run(&store)?;
//!
//! println!("{} rows, accuracy {:.3}", output.dataset.len(), output.report.accuracy);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod model;
pub mod session;
pub mod storage;
pub mod vocabulary;

pub use error::{Error, Result};

use tracing::info;

use config::PipelineConfig;
use dataset::{AssemblyStats, Dataset, DatasetAssembler, Split, StratifiedSplit};
use features::FillPolicy;
use model::{EvaluationReport, ModelTrainer, TrainedModel};
use session::SessionStore;
use vocabulary::{AreaVocabulary, VocabularyOrder};

/// End-to-end batch run: vocabulary, table, split, forest, report.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Frozen area vocabulary
    pub vocabulary: AreaVocabulary,
    /// Assembled feature table
    pub dataset: Dataset,
    /// Assembly counters
    pub stats: AssemblyStats,
    /// Training/validation row indices
    pub split: Split,
    /// Forest fitted on the training partition
    pub model: TrainedModel,
    /// Validation metrics
    pub report: EvaluationReport,
}

impl Pipeline {
    /// Create a new pipeline builder
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Pipeline settings in use.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Freeze the vocabulary and assemble the feature table.
    ///
    /// # Errors
    ///
    /// Returns `Error::Schema` or `Error::Vocabulary` from assembly.
    pub fn build_dataset<S>(&self, store: &S) -> Result<(Dataset, AssemblyStats)>
    where
        S: SessionStore + ?Sized,
    {
        let vocabulary =
            AreaVocabulary::build(store.sessions(), self.config.extraction.vocabulary_order);
        DatasetAssembler::new(self.config.extraction.clone()).assemble(store, &vocabulary)
    }

    /// Split `dataset`, fit the forest and score the validation partition.
    ///
    /// # Errors
    ///
    /// Returns `Error::Split` if either partition would be empty or the
    /// training partition holds a single class.
    pub fn train(&self, dataset: &Dataset) -> Result<(Split, TrainedModel, EvaluationReport)> {
        let split = StratifiedSplit::from_config(&self.config.split).split(dataset)?;
        let model = ModelTrainer::new(self.config.forest.clone()).fit(&split.training(dataset))?;
        let report = model.evaluate(&split.validation(dataset))?;
        Ok((split, model, report))
    }

    /// Run every stage on `store`.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage; no partial output is produced.
    pub fn run<S>(&self, store: &S) -> Result<PipelineOutput>
    where
        S: SessionStore + ?Sized,
    {
        let (dataset, stats) = self.build_dataset(store)?;
        let (split, model, report) = self.train(&dataset)?;
        info!(
            rows = dataset.len(),
            features = dataset.schema().width(),
            accuracy = report.accuracy,
            "Pipeline finished"
        );

        Ok(PipelineOutput {
            vocabulary: dataset.vocabulary().clone(),
            dataset,
            stats,
            split,
            model,
            report,
        })
    }
}

/// Pipeline builder
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Replace all settings, e.g. with a loaded config file.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed both the split and the forest.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.config.split.seed = seed;
        self.config.forest.seed = seed;
        self
    }

    /// Number of trees in the forest.
    #[must_use]
    pub const fn trees(mut self, n_trees: usize) -> Self {
        self.config.forest.n_trees = n_trees;
        self
    }

    /// Share of each class held out for validation.
    #[must_use]
    pub const fn validation_fraction(mut self, fraction: f64) -> Self {
        self.config.split.validation_fraction = fraction;
        self
    }

    /// Column order of the area vocabulary.
    #[must_use]
    pub const fn vocabulary_order(mut self, order: VocabularyOrder) -> Self {
        self.config.extraction.vocabulary_order = order;
        self
    }

    /// Value written for areas a session did not record.
    #[must_use]
    pub const fn fill_policy(mut self, policy: FillPolicy) -> Self {
        self.config.extraction.fill_policy = policy;
        self
    }

    /// Toggle rayon for both extraction and tree fitting.
    #[must_use]
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.config.extraction.parallel = parallel;
        self.config.forest.parallel = parallel;
        self
    }

    /// Build the pipeline
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if any setting is out of range
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;
        Ok(Pipeline {
            config: self.config,
        })
    }
}
