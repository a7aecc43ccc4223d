//! History listing and per-entry actions.
//!
//! Presents the entry store newest-first and maps 1-based display positions
//! back to store indices for play/export/delete. Listeners that want to
//! follow changes subscribe to the store's revision channel instead of
//! polling the file.

use crate::audio::mime_type_for;
use crate::store::{Entry, EntryStore, PersistenceError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

/// A failed copy/delete of a local audio file. Cleanup failures are logged
/// and never block; only the export copy itself is surfaced.
#[derive(Debug, Error)]
#[error("file operation '{action}' on {} failed: {source}", .path.display())]
pub struct FileOpError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("no recording at position {index} (history holds {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("audio file missing: {}", .0.display())]
    MissingFile(PathBuf),
    #[error(transparent)]
    FileOp(#[from] FileOpError),
    #[error("{0}")]
    Player(String),
}

/// What `export` produced: the written copy and its suggested MIME type.
#[derive(Debug)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub mime_type: &'static str,
}

/// Read-side controller over the entry store.
#[derive(Clone)]
pub struct HistoryController {
    store: EntryStore,
}

impl HistoryController {
    pub fn new(store: EntryStore) -> Self {
        Self { store }
    }

    /// Returns all entries newest-first (the display order).
    pub async fn refresh(&self) -> Result<Vec<Entry>, PersistenceError> {
        let mut entries = self.store.list().await?;
        entries.reverse();
        Ok(entries)
    }

    /// Receiver on the store's revision counter; any observed change means
    /// the history may differ.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    /// Resolves a 1-based display position (1 = most recent) to its entry.
    pub async fn resolve(&self, display_index: usize) -> Result<Entry, HistoryError> {
        let entries = self.store.list().await?;
        let len = entries.len();

        if display_index == 0 || display_index > len {
            return Err(HistoryError::OutOfRange {
                index: display_index,
                len,
            });
        }

        Ok(entries[len - display_index].clone())
    }

    /// Plays the entry at `display_index` through the system audio player,
    /// blocking until the player returns.
    pub async fn play(&self, display_index: usize) -> Result<Entry, HistoryError> {
        let entry = self.resolve(display_index).await?;

        if !entry.local_path.exists() {
            return Err(HistoryError::MissingFile(entry.local_path.clone()));
        }

        info!(
            "Playing recording #{} ({})",
            display_index, entry.file_name
        );
        play_with_system_player(&entry.local_path)?;
        Ok(entry)
    }

    /// Copies the entry's audio file to `destination` under its friendly
    /// file name. `None` exports into the current directory; an existing
    /// directory gets the file placed inside it.
    pub async fn export(
        &self,
        display_index: usize,
        destination: Option<PathBuf>,
    ) -> Result<ExportedFile, HistoryError> {
        let entry = self.resolve(display_index).await?;

        let target = match destination {
            Some(path) if path.is_dir() => path.join(&entry.file_name),
            Some(path) => path,
            None => PathBuf::from(&entry.file_name),
        };

        std::fs::copy(&entry.local_path, &target).map_err(|source| FileOpError {
            action: "copy",
            path: entry.local_path.clone(),
            source,
        })?;

        info!("Exported {} to {}", entry.file_name, target.display());
        Ok(ExportedFile {
            path: target,
            mime_type: mime_type_for(&entry.file_name),
        })
    }

    /// Deletes the entry at `display_index`: the store record first, then a
    /// best-effort removal of the audio file.
    pub async fn delete(&self, display_index: usize) -> Result<Entry, HistoryError> {
        let entries = self.store.list().await?;
        let len = entries.len();

        if display_index == 0 || display_index > len {
            return Err(HistoryError::OutOfRange {
                index: display_index,
                len,
            });
        }

        // Display position 1 is the newest entry, i.e. the last stored one
        let store_index = len - display_index;
        let removed = self.store.remove_at(store_index).await?;

        if let Err(source) = std::fs::remove_file(&removed.local_path) {
            if source.kind() != ErrorKind::NotFound {
                let err = FileOpError {
                    action: "delete",
                    path: removed.local_path.clone(),
                    source,
                };
                warn!("Recording file left behind: {}", err);
            }
        }

        info!("Deleted recording {}", removed.file_name);
        Ok(removed)
    }
}

/// Opens `path` with the platform's default audio player.
///
/// On macOS this is `open`; on Linux `xdg-open` with fallbacks to common
/// players (mpv, vlc, ffplay, paplay).
fn play_with_system_player(path: &Path) -> Result<(), HistoryError> {
    #[cfg(target_os = "macos")]
    {
        Command::new("open")
            .arg(path)
            .spawn()
            .map_err(|e| HistoryError::Player(format!("failed to open audio player: {e}")))?
            .wait()
            .map_err(|e| HistoryError::Player(format!("audio player error: {e}")))?;
        Ok(())
    }

    #[cfg(target_os = "linux")]
    {
        match Command::new("xdg-open").arg(path).spawn() {
            Ok(mut child) => {
                child
                    .wait()
                    .map_err(|e| HistoryError::Player(format!("audio player error: {e}")))?;
                Ok(())
            }
            Err(_) => {
                // Fall back to common audio players if xdg-open is absent
                let players = ["mpv", "vlc", "ffplay", "paplay"];
                for player in players {
                    if let Ok(mut child) = Command::new(player).arg(path).spawn() {
                        let _ = child.wait();
                        return Ok(());
                    }
                }
                Err(HistoryError::Player(
                    "no audio player found. Install mpv, vlc, ffplay, or paplay".to_string(),
                ))
            }
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = path;
        Err(HistoryError::Player(
            "system playback is not supported on this platform".to_string(),
        ))
    }
}
