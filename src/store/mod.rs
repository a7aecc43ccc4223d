//! Persistent entry store.
//!
//! All recordings live in a single JSON document, an ordered array with the
//! oldest entry first. Every operation takes an exclusive lock, reads the
//! whole document, applies one mutation and writes the whole document back,
//! so concurrent writers within the process can never interleave partial
//! updates. Mutations bump a revision counter that listeners can watch
//! instead of polling the file.

pub mod entry;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::debug;

pub use entry::{build_file_name, Entry, EntryTags, Material, Shape, Size};

/// Errors raised by entry persistence. These are always surfaced to the
/// caller; losing a recording's metadata is never silent.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read entry store at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write entry store at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("entry store at {path} is not a valid entry document: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("entry index {index} is out of range (store holds {len})")]
    OutOfRange { index: usize, len: usize },
}

struct StoreInner {
    path: PathBuf,
    lock: Mutex<()>,
    revision: watch::Sender<u64>,
}

/// Handle to the on-disk entry document. Clones share the same lock and
/// revision channel.
#[derive(Clone)]
pub struct EntryStore {
    inner: Arc<StoreInner>,
}

impl EntryStore {
    /// Opens the store backed by `path`. The file is created lazily on the
    /// first mutation; a missing file reads as an empty store.
    pub fn open(path: PathBuf) -> Self {
        let (revision, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(StoreInner {
                path,
                lock: Mutex::new(()),
                revision,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Returns a receiver that observes the store revision. The value only
    /// ever increases; any change means the entry list may differ.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Returns all entries in storage order (oldest first).
    pub async fn list(&self) -> Result<Vec<Entry>, PersistenceError> {
        let _guard = self.inner.lock.lock().await;
        read_document(&self.inner.path)
    }

    /// Appends `entry` at the end of the document.
    pub async fn append(&self, entry: Entry) -> Result<(), PersistenceError> {
        let _guard = self.inner.lock.lock().await;
        let mut entries = read_document(&self.inner.path)?;
        entries.push(entry);
        write_document(&self.inner.path, &entries)?;
        drop(_guard);

        self.bump_revision();
        Ok(())
    }

    /// Attaches `remote_url` to the most recent entry named `file_name`.
    ///
    /// Matching by name rather than by position keeps the patch correct when
    /// uploads resolve out of order or entries were deleted in the meantime.
    /// Returns `false` when no such entry exists anymore, which the caller
    /// treats as a benign race, not an error.
    pub async fn patch_remote_url(
        &self,
        file_name: &str,
        remote_url: &str,
    ) -> Result<bool, PersistenceError> {
        let _guard = self.inner.lock.lock().await;
        let mut entries = read_document(&self.inner.path)?;

        let target = entries
            .iter_mut()
            .rev()
            .find(|entry| entry.file_name == file_name);

        let Some(entry) = target else {
            return Ok(false);
        };

        entry.remote_url = Some(remote_url.to_string());
        write_document(&self.inner.path, &entries)?;
        drop(_guard);

        self.bump_revision();
        Ok(true)
    }

    /// Removes and returns the entry at `index` (storage order). The caller
    /// is responsible for cleaning up the audio file afterwards.
    pub async fn remove_at(&self, index: usize) -> Result<Entry, PersistenceError> {
        let _guard = self.inner.lock.lock().await;
        let mut entries = read_document(&self.inner.path)?;

        if index >= entries.len() {
            return Err(PersistenceError::OutOfRange {
                index,
                len: entries.len(),
            });
        }

        let removed = entries.remove(index);
        write_document(&self.inner.path, &entries)?;
        drop(_guard);

        self.bump_revision();
        Ok(removed)
    }

    fn bump_revision(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
        debug!(revision = *self.inner.revision.borrow(), "entry store changed");
    }
}

fn read_document(path: &Path) -> Result<Vec<Entry>, PersistenceError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source: err,
            })
        }
    };

    serde_json::from_str(&raw).map_err(|err| PersistenceError::Corrupt {
        path: path.to_path_buf(),
        source: err,
    })
}

fn write_document(path: &Path, entries: &[Entry]) -> Result<(), PersistenceError> {
    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::pretty(&mut buffer);
    entries
        .serialize(&mut serializer)
        .map_err(|err| PersistenceError::Corrupt {
            path: path.to_path_buf(),
            source: err,
        })?;

    std::fs::write(path, buffer).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_entry(name: &str) -> Entry {
        Entry::new(
            PathBuf::from(format!("/tmp/{name}")),
            name.to_string(),
            EntryTags::default(),
            Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::open(dir.path().join("entries.json"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_bump_revision() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::open(dir.path().join("entries.json"));
        let rx = store.subscribe();
        assert_eq!(*rx.borrow(), 0);

        store.append(sample_entry("a.wav")).await.unwrap();
        assert_eq!(*rx.borrow(), 1);

        store.patch_remote_url("a.wav", "https://example/a.wav").await.unwrap();
        assert_eq!(*rx.borrow(), 2);

        store.remove_at(0).await.unwrap();
        assert_eq!(*rx.borrow(), 3);
    }

    #[tokio::test]
    async fn test_patch_targets_latest_entry_with_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::open(dir.path().join("entries.json"));

        store.append(sample_entry("dup.wav")).await.unwrap();
        store.append(sample_entry("other.wav")).await.unwrap();
        store.append(sample_entry("dup.wav")).await.unwrap();

        let patched = store
            .patch_remote_url("dup.wav", "https://example/dup.wav")
            .await
            .unwrap();
        assert!(patched);

        let entries = store.list().await.unwrap();
        assert!(entries[0].remote_url.is_none());
        assert!(entries[1].remote_url.is_none());
        assert_eq!(
            entries[2].remote_url.as_deref(),
            Some("https://example/dup.wav")
        );
    }

    #[tokio::test]
    async fn test_patch_after_delete_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::open(dir.path().join("entries.json"));

        store.append(sample_entry("gone.wav")).await.unwrap();
        store.remove_at(0).await.unwrap();

        let patched = store
            .patch_remote_url("gone.wav", "https://example/gone.wav")
            .await
            .unwrap();
        assert!(!patched);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::open(dir.path().join("entries.json"));
        store.append(sample_entry("only.wav")).await.unwrap();

        let err = store.remove_at(5).await.unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::OutOfRange { index: 5, len: 1 }
        ));
    }
}
