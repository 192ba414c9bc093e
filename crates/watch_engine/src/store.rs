use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use watch_core::{record_file_name, ObservationSet, ReconcileOutcome};
use watch_logging::{watch_debug, watch_info};

/// Failure to read or write a topic's record. Both read and parse failures
/// mean the persisted state is unusable and need operator attention.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state directory {path:?} is not usable: {source}")]
    Dir { path: PathBuf, source: io::Error },
    #[error("could not read record {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("record {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not write record {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Per-topic observation records, one JSON array of strings per file.
#[derive(Debug, Clone)]
pub struct ObservationStore {
    dir: PathBuf,
}

impl ObservationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, topic: &str) -> PathBuf {
        self.dir.join(record_file_name(topic))
    }

    /// Loads a topic's set. A missing record yields an empty set flagged fresh.
    pub fn load(&self, topic: &str) -> Result<(ObservationSet, bool), StoreError> {
        let path = self.record_path(topic);
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok((ObservationSet::new(), true));
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        let items: Vec<String> = serde_json::from_str(&content)
            .map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;
        Ok((ObservationSet::from_items(items), false))
    }

    /// Replaces the topic's record with `set`.
    pub fn save(&self, topic: &str, set: &ObservationSet) -> Result<PathBuf, StoreError> {
        let path = self.record_path(topic);
        let content = serde_json::to_string_pretty(set.items())
            .map_err(|err| write_error(&path, err))?;
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Dir {
            path: self.dir.clone(),
            source,
        })?;
        write_atomic(&self.dir, &path, &content).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Loads, reconciles against `current` and persists the topic's set.
    ///
    /// The record is written when the set changed, and created on first use
    /// even if empty. Nothing is written when loading fails.
    pub fn reconcile(&self, topic: &str, current: &[String]) -> Result<ReconcileOutcome, StoreError> {
        let (mut set, fresh) = self.load(topic)?;
        let outcome = set.reconcile(current);

        if outcome.changed || fresh {
            let path = self.save(topic, &set)?;
            watch_info!(
                "Topic {:?}: {} new, {} dropped, {} tracked, record {:?}",
                topic,
                outcome.new_items.len(),
                outcome.dropped,
                set.len(),
                path
            );
        } else {
            watch_debug!("Topic {:?}: record unchanged", topic);
        }
        Ok(outcome)
    }
}

/// Encoding failures happen on the way out; they say nothing about the record on disk.
fn write_error(path: &Path, err: serde_json::Error) -> StoreError {
    StoreError::Write {
        path: path.to_path_buf(),
        source: io::Error::from(err),
    }
}

/// Write to a temp file in `dir`, then rename over `target`.
fn write_atomic(dir: &Path, target: &Path, content: &str) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_failure_is_a_write_error_not_corruption() {
        let err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let mapped = write_error(Path::new("data/sofas.json"), err);
        assert!(
            matches!(mapped, StoreError::Write { ref path, .. } if path == Path::new("data/sofas.json")),
            "unexpected error: {mapped:?}"
        );
    }

    #[test]
    fn unwritable_directory_is_reported_as_dir_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let store = ObservationStore::new(blocker.join("data"));

        let err = store.save("sofas", &ObservationSet::from_items(vec!["a".to_string()])).unwrap_err();
        assert!(matches!(err, StoreError::Dir { .. }), "unexpected error: {err:?}");
    }
}
