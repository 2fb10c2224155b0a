//! Error types for neurotab
//!
//! Structural errors (schema, vocabulary) name the offending session and
//! trial so a failed build can be traced back to its input file.

use std::fmt;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Where in the session store an error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Session identifier
    pub session_id: u32,
    /// Trial index within the session, if the error is trial-specific
    pub trial: Option<usize>,
}

impl Location {
    /// Location covering a whole session.
    #[must_use]
    pub const fn session(session_id: u32) -> Self {
        Self {
            session_id,
            trial: None,
        }
    }

    /// Location of a single trial.
    #[must_use]
    pub const fn trial(session_id: u32, trial: usize) -> Self {
        Self {
            session_id,
            trial: Some(trial),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.trial {
            Some(trial) => write!(f, "session {}, trial {trial}", self.session_id),
            None => write!(f, "session {}", self.session_id),
        }
    }
}

/// neurotab error types
#[derive(Error, Debug)]
pub enum Error {
    /// Session data does not match the expected shape (fatal for the session)
    #[error("Schema error at {at}: {reason}")]
    Schema {
        /// Offending session/trial
        at: Location,
        /// What disagreed
        reason: String,
    },

    /// Neuron area label missing from the frozen vocabulary
    #[error("Vocabulary error at {at}: area '{area}' is not in the frozen vocabulary\nRebuild the vocabulary from the same session store.")]
    Vocabulary {
        /// Offending session/trial
        at: Location,
        /// Unknown area label
        area: String,
    },

    /// Stratified split or training cannot proceed on this dataset
    #[error("Split error: {0}")]
    Split(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage error (Parquet/Arrow)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a schema error.
    pub fn schema(at: Location, reason: impl Into<String>) -> Self {
        Self::Schema {
            at,
            reason: reason.into(),
        }
    }
}
