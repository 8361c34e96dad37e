//! Durable slots holding the snapshot of a survey.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use snafu::{prelude::*, Snafu};

use crate::model::Snapshot;

#[derive(Debug, Snafu)]
pub enum StorageError {
    #[snafu(display("Error reading snapshot {}", path.display()))]
    ReadSnapshot {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Error writing snapshot {}", path.display()))]
    WriteSnapshot {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("The stored snapshot is not a valid survey"))]
    DecodeSnapshot { source: serde_json::Error },
    #[snafu(display("The survey could not be serialized"))]
    EncodeSnapshot { source: serde_json::Error },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A single named record that holds the whole state of a survey.
pub trait SnapshotStorage {
    /// The stored snapshot, or None if nothing has been saved yet.
    fn load(&self) -> StorageResult<Option<Snapshot>>;

    /// Replaces the stored snapshot.
    fn save(&mut self, snapshot: &Snapshot) -> StorageResult<()>;
}

// Older stores wrapped the collections in a versioned envelope:
// {"state": {...}, "version": 0}
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    state: Snapshot,
    #[serde(default)]
    version: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSnapshot {
    Envelope(Envelope),
    Bare(Snapshot),
}

pub fn decode_snapshot(contents: &str) -> StorageResult<Snapshot> {
    let stored: StoredSnapshot = serde_json::from_str(contents).context(DecodeSnapshotSnafu {})?;
    Ok(match stored {
        StoredSnapshot::Envelope(Envelope { state, version }) => {
            debug!("decode_snapshot: migrating enveloped snapshot (version {:?})", version);
            state
        }
        StoredSnapshot::Bare(snapshot) => snapshot,
    })
}

pub fn encode_snapshot(snapshot: &Snapshot) -> StorageResult<String> {
    serde_json::to_string_pretty(snapshot).context(EncodeSnapshotSnafu {})
}

/// Keeps the serialized snapshot in memory.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Option<String>,
    saves: usize,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    /// A slot that already holds the given serialized snapshot.
    pub fn with_contents(contents: &str) -> MemoryStorage {
        MemoryStorage {
            slot: Some(contents.to_string()),
            saves: 0,
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self) -> StorageResult<Option<Snapshot>> {
        self.slot.as_deref().map(decode_snapshot).transpose()
    }

    fn save(&mut self, snapshot: &Snapshot) -> StorageResult<()> {
        self.slot = Some(encode_snapshot(snapshot)?);
        self.saves += 1;
        Ok(())
    }
}

/// Stores the snapshot as a pretty-printed JSON file.
///
/// Writes go through a sibling temporary file that is then renamed over the
/// target, so a crash never leaves a truncated snapshot behind.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> JsonFileStorage {
        JsonFileStorage {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temporary_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(".tmp");
        PathBuf::from(p)
    }
}

impl SnapshotStorage for JsonFileStorage {
    fn load(&self) -> StorageResult<Option<Snapshot>> {
        if !self.path.exists() {
            debug!("load: no snapshot at {:?}", self.path);
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).context(ReadSnapshotSnafu {
            path: self.path.clone(),
        })?;
        decode_snapshot(&contents).map(Some)
    }

    fn save(&mut self, snapshot: &Snapshot) -> StorageResult<()> {
        let contents = encode_snapshot(snapshot)?;
        let tmp = self.temporary_path();
        fs::write(&tmp, contents).context(WriteSnapshotSnafu { path: tmp.clone() })?;
        fs::rename(&tmp, &self.path).context(WriteSnapshotSnafu {
            path: self.path.clone(),
        })?;
        debug!("save: wrote snapshot to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_slot_starts_empty() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load().unwrap(), None);
        assert_eq!(storage.saves(), 0);
    }

    #[test]
    fn decodes_enveloped_snapshot() {
        let contents = r#"{
            "state": {
                "participants": [{
                    "id": "k2j3h4",
                    "email": "Ana@X.com",
                    "firstName": "Ana",
                    "lastName": "Lee",
                    "createdAt": "2024-03-01T10:00:00.000Z",
                    "hasVoted": false
                }],
                "questions": [],
                "votes": []
            },
            "version": 0
        }"#;
        let snapshot = decode_snapshot(contents).unwrap();
        assert_eq!(snapshot.participants.len(), 1);
        assert_eq!(snapshot.participants[0].email, "Ana@X.com");
        assert_eq!(snapshot.participants[0].first_name, "Ana");
    }

    #[test]
    fn rejects_garbage() {
        let res = decode_snapshot("not json");
        assert!(matches!(res, Err(StorageError::DecodeSnapshot { .. })));
    }

    #[test]
    fn rejects_foreign_json() {
        let res = decode_snapshot(r#"{"storePath": "x.json", "baseUrl": "http://h"}"#);
        assert!(matches!(res, Err(StorageError::DecodeSnapshot { .. })));
        let res = decode_snapshot(r#"{"state": {"participants": []}, "owner": "me"}"#);
        assert!(matches!(res, Err(StorageError::DecodeSnapshot { .. })));
    }

    #[test]
    fn foreign_file_is_not_overwritten_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let foreign = r#"{"storePath": "survey.json"}"#;
        fs::write(&path, foreign).unwrap();
        let storage = JsonFileStorage::new(&path);
        assert!(matches!(
            storage.load(),
            Err(StorageError::DecodeSnapshot { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), foreign);
    }

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("survey.json"));
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.json");
        let mut storage = JsonFileStorage::new(&path);
        let snapshot = Snapshot::default();
        storage.save(&snapshot).unwrap();
        assert!(path.exists());
        assert!(!storage.temporary_path().exists());
        assert_eq!(storage.load().unwrap(), Some(snapshot));
    }
}
