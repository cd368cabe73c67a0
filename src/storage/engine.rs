use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::background::metrics::EVENTS_STORED;
use crate::background::types::Pruner;
use crate::storage::error::StorageError;
use crate::storage::snapshot;
use crate::storage::types::{Event, StoreState};

/// Embedded event store backed by a single state file.
///
/// Every read runs under the read lock and sees one committed state. Writes
/// are applied to a copy, persisted, and only then swapped in, so a failed
/// write leaves both memory and disk untouched.
#[derive(Debug)]
pub struct EventStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl EventStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let state = snapshot::load(&path)?.unwrap_or_default();
        EVENTS_STORED.set(state.events.len() as i64);

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only transaction.
    pub fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        let state = self.state.read();
        f(&state)
    }

    /// Read-write transaction. Committed only if `f` succeeds and the new
    /// state reaches disk.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut state = self.state.write();
        let mut next = state.clone();
        let out = f(&mut next)?;

        snapshot::persist(&self.path, &next)?;
        EVENTS_STORED.set(next.events.len() as i64);
        *state = next;

        Ok(out)
    }

    pub fn append(&self, payload: Vec<u8>) -> Result<u64, StorageError> {
        self.write(|state| Ok(state.push(payload, Utc::now())))
    }

    pub fn range(&self, after: u64, limit: usize) -> (Vec<Event>, bool) {
        self.read(|state| state.range(after, limit))
    }

    pub fn len(&self) -> usize {
        self.read(|state| state.events.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn check(&self) -> Result<(), StorageError> {
        self.read(|state| {
            if state.is_consistent() {
                Ok(())
            } else {
                Err(StorageError::Inconsistent(format!(
                    "last assigned id {} is behind stored events",
                    state.last_id
                )))
            }
        })
    }

    /// Encodes the whole store, in state-file format, from one read
    /// transaction.
    pub fn snapshot(&self) -> Result<Bytes, StorageError> {
        self.read(snapshot::encode)
    }

    /// Writes a point-in-time snapshot of the whole store to `w`.
    pub fn dump(&self, w: &mut dyn Write) -> Result<(), StorageError> {
        w.write_all(&self.snapshot()?)?;
        Ok(())
    }
}

impl Pruner for EventStore {
    fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        // Skip the rewrite when nothing is old enough.
        let stale = self.read(|state| state.events.values().any(|e| e.timestamp < cutoff));
        if !stale {
            return Ok(0);
        }
        self.write(|state| Ok(state.prune(cutoff)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use chrono::Duration;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, EventStore) {
        let dir = TempDir::new().unwrap();
        let store = EventStore::open(dir.path().join("data").join("state")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_append_and_range() {
        let (_dir, store) = open_temp();
        assert!(store.is_empty());

        assert_eq!(store.append(b"one".to_vec()).unwrap(), 1);
        assert_eq!(store.append(b"two".to_vec()).unwrap(), 2);

        let (events, has_more) = store.range(1, 10);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, b"two");
        assert!(!has_more);
    }

    #[test]
    fn test_reopen_restores_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state");

        {
            let store = EventStore::open(&path).unwrap();
            store.append(b"persisted".to_vec()).unwrap();
        }

        let store = EventStore::open(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.append(b"next".to_vec()).unwrap(), 2);
    }

    #[test]
    fn test_open_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state");
        std::fs::write(&path, b"definitely not a state file").unwrap();

        assert!(matches!(
            EventStore::open(&path),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let (_dir, store) = open_temp();
        store.append(b"keep".to_vec()).unwrap();

        let result: Result<(), _> = store.write(|state| {
            state.push(b"discard".to_vec(), Utc::now());
            Err(StorageError::Inconsistent("abort".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_prune_removes_old_events() {
        let (_dir, store) = open_temp();
        let now = Utc::now();
        store
            .write(|state| {
                state.push(b"old".to_vec(), now - Duration::hours(3));
                state.push(b"fresh".to_vec(), now);
                Ok(())
            })
            .unwrap();

        let removed = store.prune(now - Duration::hours(2)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);

        // Nothing left to remove.
        assert_eq!(store.prune(now - Duration::hours(2)).unwrap(), 0);
    }

    #[test]
    fn test_dump_is_consistent_under_concurrent_writes() {
        let (_dir, store) = open_temp();
        let store = Arc::new(store);
        let stop = Arc::new(AtomicBool::new(false));

        // Writer only ever commits pairs of events.
        let writer = {
            let store = store.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    store
                        .write(|state| {
                            let now = Utc::now();
                            state.push(b"a".to_vec(), now);
                            state.push(b"b".to_vec(), now);
                            Ok(())
                        })
                        .unwrap();
                }
            })
        };

        for _ in 0..50 {
            let mut buf = Vec::new();
            store.dump(&mut buf).unwrap();
            let state = snapshot::decode(&buf).unwrap();
            assert_eq!(state.events.len() % 2, 0);
            assert_eq!(state.last_id as usize, state.events.len());
        }

        stop.store(true, Ordering::Relaxed);
        writer.join().unwrap();
    }

    #[test]
    fn test_check_passes_for_fresh_store() {
        let (_dir, store) = open_temp();
        store.check().unwrap();
    }
}
