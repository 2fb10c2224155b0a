//! Cross-session feature extraction
//!
//! Each trial becomes a [`FeatureVector`] of width `2 + 3 * |areas|`:
//! the two stimulus contrasts, then per-area total spikes, early-half mean
//! rate and late-half mean rate, projected onto the frozen
//! [`AreaVocabulary`](crate::vocabulary::AreaVocabulary). Areas a session
//! did not record get the [`FillPolicy`] value, so every row is
//! column-aligned regardless of which neurons its session holds.
//!
//! ## Usage
//!
//! ```rust
//! use neurotab::features::FeatureExtractor;
//! use neurotab::session::{Contrast, Feedback, Session, SpikeMatrix, Trial};
//! use neurotab::vocabulary::AreaVocabulary;
//!
//! let spikes = SpikeMatrix::from_rows(vec![vec![1, 0, 1, 0], vec![1, 1, 1, 1]]).unwrap();
//! let session = Session::builder(1, "Cori", "2016-12-14")
//!     .neuron_areas(["CA1", "root"])
//!     .trial(Trial::new(Contrast::Zero, Contrast::Full, Feedback::Success, spikes))
//!     .build()?;
//!
//! let vocabulary = AreaVocabulary::from_labels(["CA1", "DG", "root"]);
//! let extractor = FeatureExtractor::new(&vocabulary);
//! let row = extractor.extract(&session, 0)?;
//!
//! assert_eq!(row.len(), 2 + 3 * vocabulary.len());
//! assert_eq!(row.values()[extractor.schema().index_of("total_spikes.DG").unwrap()], 0.0);
//! # Ok::<(), neurotab::Error>(())
//! ```

mod extract;
mod schema;
mod vector;
mod window;

pub use extract::{AreaGrouping, FeatureExtractor, FillPolicy};
pub use schema::{AreaFeature, FeatureSchema, CONTRAST_LEFT, CONTRAST_RIGHT, STIMULUS_COLUMNS};
pub use vector::FeatureVector;
pub use window::{NeuronActivity, TimeWindows};
