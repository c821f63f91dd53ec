use std::env;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::Snapshot;

const STORE_FILE: &str = "store.json";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::JsonDecode(err) => write!(f, "failed to parse snapshot: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode snapshot: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// The persistence collaborator: one whole-state snapshot per key.
/// `load` returning `None` means first run.
pub trait SnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>, StorageError>;
    fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError>;
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::Io(err)),
        };

        if raw.trim().is_empty() {
            return Ok(None);
        }

        let snapshot = serde_json::from_str(&raw).map_err(StorageError::JsonDecode)?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StorageError::Io)?;
            }
        }

        let body = serde_json::to_string_pretty(snapshot).map_err(StorageError::JsonEncode)?;
        fs::write(&self.path, body).map_err(StorageError::Io)
    }
}

pub fn resolve_store_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }

    if let Some(path) = env::var_os("TIMEFLOW_STORE") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    state_dir().join(STORE_FILE)
}

fn state_dir() -> PathBuf {
    if let Some(path) = env::var_os("TIMEFLOW_STATE_DIR") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(path) = env::var_os("LOCALAPPDATA") {
            return PathBuf::from(path).join("timeflow");
        }
    }

    if let Some(path) = env::var_os("XDG_STATE_HOME") {
        return PathBuf::from(path).join("timeflow");
    }

    if let Some(path) = env::var_os("HOME") {
        return PathBuf::from(path)
            .join(".local")
            .join("state")
            .join("timeflow");
    }

    PathBuf::from(".timeflow")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chrono::{Duration, Local, TimeZone};

    use crate::domain::{ActiveSession, Tracker};

    use super::{JsonFileStore, SnapshotStore};

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }

    #[test]
    fn missing_or_empty_file_loads_as_first_run() {
        let store = JsonFileStore::new(temp_file("timeflow_store_missing.json"));
        assert!(store.load().expect("load should succeed").is_none());

        fs::write(store.path(), "  \n").expect("write should succeed");
        assert!(store.load().expect("load should succeed").is_none());
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn round_trips_the_whole_snapshot() {
        let mut tracker = Tracker::seeded();
        let task_id = tracker.tasks[0].id.clone();
        let start = Local.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        tracker.start_work(&task_id, start);
        tracker.start_break(start + Duration::seconds(1500));

        let store = JsonFileStore::new(temp_file("timeflow_store_roundtrip.json"));
        store
            .save(&tracker.snapshot())
            .expect("save should succeed");
        let loaded = store
            .load()
            .expect("load should succeed")
            .expect("snapshot should exist");

        assert_eq!(loaded.tasks.len(), 3);
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.entries[0].duration, 1500);
        let session: ActiveSession = loaded.active_session.expect("session should survive");
        assert!(session.is_break);
        assert_eq!(session.work_start, Some(start));
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn snapshot_wire_shape_uses_camel_case_keys() {
        let mut tracker = Tracker::seeded();
        let task_id = tracker.tasks[0].id.clone();
        let start = Local.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        tracker.start_work(&task_id, start);
        tracker.finish_work(start + Duration::seconds(60));
        tracker.start_work(&task_id, start + Duration::seconds(120));

        let body = serde_json::to_string(&tracker.snapshot()).expect("encode should succeed");
        for key in [
            "\"tasks\"",
            "\"entries\"",
            "\"activeSession\"",
            "\"taskId\"",
            "\"isBreak\"",
            "\"startTime\"",
            "\"endTime\"",
            "\"workStartTime\"",
            "\"task\"",
        ] {
            assert!(body.contains(key), "missing {key} in {body}");
        }
    }
}
