//! Session stores
//!
//! The pipeline only needs ordered, read-only access to validated sessions.
//! [`MemorySessionStore`] is the default implementation and knows how to
//! load the JSON session export.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use tracing::{debug, info};

use super::{Session, SessionRecord};
use crate::{Error, Result};

/// Ordered, read-only access to sessions.
///
/// Session order defines row order of the assembled dataset, so
/// implementations must return sessions in a stable order.
pub trait SessionStore: Send + Sync {
    /// All sessions, in dataset order.
    fn sessions(&self) -> &[Session];

    /// Look up a session by id.
    fn session(&self, id: u32) -> Option<&Session> {
        self.sessions().iter().find(|s| s.id() == id)
    }

    /// Total trial count across sessions.
    fn trial_count(&self) -> usize {
        self.sessions().iter().map(|s| s.trials().len()).sum()
    }
}

/// In-memory session store.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Vec<Session>,
}

impl MemorySessionStore {
    /// Wrap already validated sessions.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if two sessions share an id.
    pub fn new(sessions: Vec<Session>) -> Result<Self> {
        let mut seen = FxHashSet::default();
        for session in &sessions {
            if !seen.insert(session.id()) {
                return Err(Error::Config(format!(
                    "duplicate session id {} in session store",
                    session.id()
                )));
            }
        }
        Ok(Self { sessions })
    }

    /// Load every `*.json` file in `dir`, in natural file-name order
    /// (`session2.json` before `session10.json`).
    ///
    /// Sessions without an explicit `sessionId` are numbered 1..=n in load order.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or any of its entries cannot be read,
    /// a file is not a valid session record, or two sessions share an id.
    pub fn load_json_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut paths = std::fs::read_dir(dir.as_ref())?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<PathBuf>>>()?;
        paths.retain(|path| path.extension().is_some_and(|ext| ext == "json"));
        paths.sort_by_cached_key(|path| natural_key(path));

        info!(
            dir = %dir.as_ref().display(),
            files = paths.len(),
            "Loading session records"
        );
        Self::load_json_files(&paths)
    }

    /// Load session records from the given files, in the given order.
    ///
    /// # Errors
    ///
    /// Returns error if a file cannot be read or parsed, fails validation,
    /// or two sessions share an id.
    pub fn load_json_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut sessions = Vec::with_capacity(paths.len());
        for (position, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path)?;
            let record: SessionRecord = serde_json::from_str(&text).map_err(|e| {
                Error::StorageError(format!("Failed to parse session file {}: {e}", path.display()))
            })?;
            let fallback_id = u32::try_from(position + 1)
                .map_err(|_| Error::Config("too many session files".to_string()))?;
            let session = record.into_session(fallback_id)?;
            debug!(
                session = session.id(),
                file = %path.display(),
                mouse = session.mouse_name(),
                neurons = session.neuron_count(),
                trials = session.trials().len(),
                "Loaded session"
            );
            sessions.push(session);
        }
        Self::new(sessions)
    }

    /// Number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// File-name chunk; digit runs compare by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NameChunk {
    Number(u128),
    Text(String),
}

fn natural_key(path: &Path) -> Vec<NameChunk> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut chunks = Vec::new();
    let mut rest = name.as_str();
    while let Some(first) = rest.chars().next() {
        let digits = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        chunks.push(match chunk.parse() {
            Ok(n) if digits => NameChunk::Number(n),
            _ => NameChunk::Text(chunk.to_string()),
        });
        rest = tail;
    }
    chunks
}

impl SessionStore for MemorySessionStore {
    fn sessions(&self) -> &[Session] {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Contrast, Feedback, SpikeMatrix, Trial};

    fn session(id: u32, trials: usize) -> Session {
        let trial = Trial::new(
            Contrast::Full,
            Contrast::Zero,
            Feedback::Success,
            SpikeMatrix::from_rows(vec![vec![1, 0]]).unwrap(),
        );
        Session::builder(id, "Hench", "2017-06-15")
            .neuron_areas(["VISp"])
            .trials(std::iter::repeat(trial).take(trials))
            .build()
            .unwrap()
    }

    #[test]
    fn test_store_default() {
        let store = MemorySessionStore::default();
        assert!(store.is_empty());
        assert_eq!(store.trial_count(), 0);
    }

    #[test]
    fn test_store_lookup_and_counts() {
        let store = MemorySessionStore::new(vec![session(1, 3), session(2, 5)]).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.trial_count(), 8);
        assert_eq!(store.session(2).unwrap().trials().len(), 5);
        assert!(store.session(3).is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = MemorySessionStore::new(vec![session(1, 1), session(1, 1)]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_json_dir_orders_by_file_name() {
        let dir = std::env::temp_dir().join(format!("neurotab-store-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let body = |mouse: &str| {
            format!(
                r#"{{"mouseName":"{mouse}","dateExperiment":"2016-12-14","neuronArea":["CA1"],
                    "trials":[{{"contrastLeft":0,"contrastRight":1,"feedbackType":1,"spikes":[[1,0]]}}]}}"#
            )
        };
        std::fs::write(dir.join("session2.json"), body("Cori")).unwrap();
        std::fs::write(dir.join("session1.json"), body("Lederberg")).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let store = MemorySessionStore::load_json_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.sessions()[0].id(), 1);
        assert_eq!(store.sessions()[0].mouse_name(), "Lederberg");
        assert_eq!(store.sessions()[1].mouse_name(), "Cori");
    }

    #[test]
    fn test_load_json_dir_numbers_files_naturally() {
        let dir = std::env::temp_dir().join(format!("neurotab-natural-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for i in 1..=12 {
            let body = format!(
                r#"{{"mouseName":"m{i}","dateExperiment":"2016-12-14","neuronArea":["CA1"],
                    "trials":[{{"contrastLeft":0,"contrastRight":1,"feedbackType":1,"spikes":[[1,0]]}}]}}"#
            );
            std::fs::write(dir.join(format!("session{i}.json")), body).unwrap();
        }

        let store = MemorySessionStore::load_json_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(store.len(), 12);
        for id in 1..=12 {
            assert_eq!(store.session(id).unwrap().mouse_name(), format!("m{id}"));
        }
    }

    #[test]
    fn test_natural_key_order() {
        let mut names = vec!["session10.json", "session2.json", "a.json", "session1.json"];
        names.sort_by_cached_key(|n| natural_key(Path::new(n)));
        assert_eq!(names, vec!["a.json", "session1.json", "session2.json", "session10.json"]);
    }

    #[test]
    fn test_load_json_dir_missing_directory() {
        let result = MemorySessionStore::load_json_dir("/nonexistent/neurotab-sessions");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
