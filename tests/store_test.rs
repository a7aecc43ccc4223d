use chrono::Utc;
use std::path::Path;

// Exercise the entry store through the public crate API, including what
// survives a process restart (modelled as reopening the same document).
use echotag::history::HistoryController;
use echotag::store::{Entry, EntryStore, EntryTags, PersistenceError};

fn sample_entry(dir: &Path, file_name: &str) -> Entry {
    Entry::new(
        dir.join(file_name),
        file_name.to_string(),
        EntryTags::default(),
        Utc::now(),
    )
}

#[tokio::test]
async fn entries_survive_reopening_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.json");

    {
        let store = EntryStore::open(path.clone());
        store.append(sample_entry(dir.path(), "first.wav")).await.unwrap();
        store.append(sample_entry(dir.path(), "second.wav")).await.unwrap();
    }

    // A fresh store over the same path sees everything, in order
    let reopened = EntryStore::open(path);
    let entries = reopened.list().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].file_name, "first.wav");
    assert_eq!(entries[1].file_name, "second.wav");
}

#[tokio::test]
async fn document_is_an_ordered_camel_case_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.json");
    let store = EntryStore::open(path.clone());

    store.append(sample_entry(dir.path(), "a.wav")).await.unwrap();
    store.append(sample_entry(dir.path(), "b.wav")).await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();

    let array = parsed.as_array().expect("top-level JSON array");
    assert_eq!(array.len(), 2);
    assert_eq!(array[0]["fileName"], "a.wav");
    assert_eq!(array[1]["fileName"], "b.wav");
    assert!(array[0].get("localPath").is_some());
    // Field names are camelCase, not snake_case
    assert!(array[0].get("file_name").is_none());
}

#[tokio::test]
async fn concurrent_appends_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.json");
    let store = EntryStore::open(path);

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        let entry = sample_entry(dir.path(), &format!("take-{i}.wav"));
        handles.push(tokio::spawn(async move { store.append(entry).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Every append won its read-modify-write cycle; none overwrote another
    let entries = store.list().await.unwrap();
    assert_eq!(entries.len(), 8);
}

#[tokio::test]
async fn remote_url_patch_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.json");

    {
        let store = EntryStore::open(path.clone());
        store.append(sample_entry(dir.path(), "uploaded.wav")).await.unwrap();
        let patched = store
            .patch_remote_url("uploaded.wav", "https://remote.example/uploaded.wav")
            .await
            .unwrap();
        assert!(patched);
    }

    let reopened = EntryStore::open(path);
    let entries = reopened.list().await.unwrap();
    assert_eq!(
        entries[0].remote_url.as_deref(),
        Some("https://remote.example/uploaded.wav")
    );
}

#[tokio::test]
async fn corrupt_document_is_reported_not_swallowed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let store = EntryStore::open(path);
    let err = store.list().await.unwrap_err();
    assert!(matches!(err, PersistenceError::Corrupt { .. }));
}

#[tokio::test]
async fn history_positions_follow_store_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.json");
    let store = EntryStore::open(path);

    for name in ["old.wav", "middle.wav", "new.wav"] {
        store.append(sample_entry(dir.path(), name)).await.unwrap();
    }

    let history = HistoryController::new(store.clone());
    let mut revision = history.subscribe();
    assert!(!revision.has_changed().unwrap());

    // Position 1 is the newest entry
    let listed = history.refresh().await.unwrap();
    assert_eq!(listed[0].file_name, "new.wav");
    assert_eq!(listed[2].file_name, "old.wav");

    // Deleting position 2 through one handle is visible through the other
    let removed = history.delete(2).await.unwrap();
    assert_eq!(removed.file_name, "middle.wav");
    assert!(revision.has_changed().unwrap());

    let entries = store.list().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].file_name, "old.wav");
    assert_eq!(entries[1].file_name, "new.wav");
}
