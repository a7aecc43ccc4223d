//! Delete a recording and its history entry.

use crate::config;
use crate::history::HistoryController;
use crate::store::EntryStore;

/// Removes a recording from history and best-effort deletes its audio file.
///
/// The entry disappears from the list even when the file removal fails;
/// leftover files are logged.
///
/// # Arguments
/// * `index` - Recording position (1 = most recent)
pub async fn handle_delete(index: usize) -> Result<(), anyhow::Error> {
    tracing::info!("=== echotag Delete Command ===");

    let store = EntryStore::open(config::entries_path()?);
    let history = HistoryController::new(store);

    let removed = history.delete(index).await?;

    println!("Deleted #{index}: {}", removed.file_name);
    Ok(())
}
