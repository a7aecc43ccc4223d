//! Best-effort upload of finished recordings.
//!
//! `submit` pushes one entry's audio file and metadata to the remote backend
//! in a spawned task. The caller never waits on the result: success patches
//! the stored entry with the remote URL, any failure is logged and the local
//! entry stands unchanged. There is no retry and no queue; each recording
//! gets exactly one attempt.

pub mod api;

use crate::audio::mime_type_for;
use crate::store::{Entry, EntryStore, Material, PersistenceError, Shape, Size};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use api::HttpBackend;

/// Errors from one upload attempt. These are only ever logged; no upload
/// failure blocks or fails the recording flow.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Transport(String),
    #[error("remote key collision: {0}")]
    Collision(String),
    #[error("{0}")]
    Rejected(String),
    #[error("unexpected response from remote: {0}")]
    BadResponse(String),
    #[error("upload succeeded but recording the remote url failed: {0}")]
    Patch(#[from] PersistenceError),
}

/// Metadata record inserted into the remote table next to the uploaded
/// object. Field names match the table's camelCase columns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub file_name: String,
    pub file_url: String,
    pub description: String,
    pub material: Material,
    pub size: Size,
    pub shape: Shape,
    pub timestamp: DateTime<Utc>,
}

impl RemoteRecord {
    pub fn from_entry(entry: &Entry, file_url: &str) -> Self {
        Self {
            file_name: entry.file_name.clone(),
            file_url: file_url.to_string(),
            description: entry.description.clone(),
            material: entry.material,
            size: entry.size,
            shape: entry.shape,
            timestamp: entry.timestamp,
        }
    }
}

/// Remote side of the upload: an object store plus a metadata table.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Uploads `bytes` under `key` and returns the object's URL. Existing
    /// keys are never overwritten; a collision fails the upload.
    async fn upload_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, UploadError>;

    /// Inserts the metadata record for an uploaded object.
    async fn insert_record(&self, record: &RemoteRecord) -> Result<(), UploadError>;
}

/// Fire-and-forget uploader. Holds the backend (if configured) and the
/// entry store for the remote-URL patch.
#[derive(Clone)]
pub struct UploadAgent {
    backend: Option<Arc<dyn RemoteBackend>>,
    store: EntryStore,
}

impl UploadAgent {
    pub fn new(backend: Option<Arc<dyn RemoteBackend>>, store: EntryStore) -> Self {
        Self { backend, store }
    }

    /// An agent that never uploads; `submit` becomes a logged no-op.
    pub fn disabled(store: EntryStore) -> Self {
        Self {
            backend: None,
            store,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Starts uploading `entry` in the background and returns the task
    /// handle, or `None` when no backend is configured. The handle lets the
    /// CLI linger for the transfer before process exit; nothing in the
    /// recording flow awaits it.
    pub fn submit(&self, entry: Entry) -> Option<JoinHandle<()>> {
        let Some(backend) = self.backend.clone() else {
            debug!(
                "No upload backend configured; keeping {} local only",
                entry.file_name
            );
            return None;
        };

        let store = self.store.clone();
        Some(tokio::spawn(async move {
            match push_entry(backend.as_ref(), &store, &entry).await {
                Ok(()) => {}
                Err(err) => warn!("Upload failed for {}: {}", entry.file_name, err),
            }
        }))
    }
}

/// One upload attempt: read file, upload bytes, insert metadata, patch the
/// local entry. Stops at the first failure.
async fn push_entry(
    backend: &dyn RemoteBackend,
    store: &EntryStore,
    entry: &Entry,
) -> Result<(), UploadError> {
    let bytes = tokio::fs::read(&entry.local_path)
        .await
        .map_err(|source| UploadError::FileRead {
            path: entry.local_path.clone(),
            source,
        })?;

    let content_type = mime_type_for(&entry.file_name);
    let url = backend
        .upload_object(&entry.file_name, bytes, content_type)
        .await?;

    backend
        .insert_record(&RemoteRecord::from_entry(entry, &url))
        .await?;

    if store.patch_remote_url(&entry.file_name, &url).await? {
        info!("Upload complete: {} -> {}", entry.file_name, url);
    } else {
        debug!(
            "Entry {} was deleted before its upload finished; skipping patch",
            entry.file_name
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntryTags;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct RecordingBackend {
        uploads: Mutex<Vec<String>>,
        inserts: Mutex<Vec<RemoteRecord>>,
        fail_upload: bool,
        fail_insert: bool,
    }

    impl RecordingBackend {
        fn new(fail_upload: bool, fail_insert: bool) -> Arc<Self> {
            Arc::new(Self {
                uploads: Mutex::new(Vec::new()),
                inserts: Mutex::new(Vec::new()),
                fail_upload,
                fail_insert,
            })
        }
    }

    #[async_trait]
    impl RemoteBackend for RecordingBackend {
        async fn upload_object(
            &self,
            key: &str,
            _bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, UploadError> {
            if self.fail_upload {
                return Err(UploadError::Transport("connection refused".into()));
            }
            self.uploads.lock().unwrap().push(key.to_string());
            Ok(format!("https://remote.example/{key}"))
        }

        async fn insert_record(&self, record: &RemoteRecord) -> Result<(), UploadError> {
            if self.fail_insert {
                return Err(UploadError::Rejected("table insert refused".into()));
            }
            self.inserts.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    async fn seeded_store(dir: &tempfile::TempDir, names: &[&str]) -> EntryStore {
        let store = EntryStore::open(dir.path().join("entries.json"));
        for name in names {
            let audio = dir.path().join(name);
            std::fs::write(&audio, b"RIFF").unwrap();
            let entry = Entry::new(
                audio,
                name.to_string(),
                EntryTags::default(),
                Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap(),
            );
            store.append(entry).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_successful_upload_patches_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir, &["a.wav"]).await;
        let backend = RecordingBackend::new(false, false);
        let agent = UploadAgent::new(Some(backend.clone()), store.clone());

        let entry = store.list().await.unwrap().remove(0);
        agent.submit(entry).unwrap().await.unwrap();

        let entries = store.list().await.unwrap();
        assert_eq!(
            entries[0].remote_url.as_deref(),
            Some("https://remote.example/a.wav")
        );
        assert_eq!(backend.inserts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_entry_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir, &["a.wav"]).await;
        let backend = RecordingBackend::new(true, false);
        let agent = UploadAgent::new(Some(backend), store.clone());

        let before = store.list().await.unwrap();
        let entry = before[0].clone();
        agent.submit(entry).unwrap().await.unwrap();

        let after = store.list().await.unwrap();
        assert_eq!(after, before);
        assert!(after[0].remote_url.is_none());
    }

    #[tokio::test]
    async fn test_insert_failure_skips_patch() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir, &["a.wav"]).await;
        let backend = RecordingBackend::new(false, true);
        let agent = UploadAgent::new(Some(backend), store.clone());

        let entry = store.list().await.unwrap().remove(0);
        agent.submit(entry).unwrap().await.unwrap();

        assert!(store.list().await.unwrap()[0].remote_url.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_agent_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir, &["a.wav"]).await;
        let agent = UploadAgent::disabled(store.clone());
        assert!(!agent.is_configured());

        let entry = store.list().await.unwrap().remove(0);
        assert!(agent.submit(entry).is_none());
        assert!(store.list().await.unwrap()[0].remote_url.is_none());
    }

    #[tokio::test]
    async fn test_out_of_order_uploads_patch_their_own_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir, &["e1.wav", "e2.wav"]).await;
        let backend = RecordingBackend::new(false, false);
        let agent = UploadAgent::new(Some(backend), store.clone());

        let entries = store.list().await.unwrap();

        // E2's upload resolves before E1's
        agent.submit(entries[1].clone()).unwrap().await.unwrap();
        agent.submit(entries[0].clone()).unwrap().await.unwrap();

        let after = store.list().await.unwrap();
        assert_eq!(
            after[0].remote_url.as_deref(),
            Some("https://remote.example/e1.wav")
        );
        assert_eq!(
            after[1].remote_url.as_deref(),
            Some("https://remote.example/e2.wav")
        );
    }

    #[test]
    fn test_remote_record_serializes_camel_case() {
        let entry = Entry::new(
            PathBuf::from("/tmp/x.wav"),
            "x.wav".to_string(),
            EntryTags::default(),
            Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap(),
        );
        let record = RemoteRecord::from_entry(&entry, "https://remote.example/x.wav");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fileName"], "x.wav");
        assert_eq!(json["fileUrl"], "https://remote.example/x.wav");
        assert_eq!(json["material"], "Plastic");
    }
}
