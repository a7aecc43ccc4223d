//! Export a recording to a caller-chosen location.

use std::path::PathBuf;

use crate::config;
use crate::history::HistoryController;
use crate::store::EntryStore;

/// Copies a recording out of the app's data directory.
///
/// Without `--out`, the file lands in the current directory under its
/// canonical name. An `--out` pointing at a directory keeps that name too;
/// anything else is used as the full target path.
///
/// # Arguments
/// * `index` - Optional recording position (1 = most recent, None = most recent)
/// * `out` - Optional destination path or directory
pub async fn handle_export(index: Option<usize>, out: Option<PathBuf>) -> Result<(), anyhow::Error> {
    tracing::info!("=== echotag Export Command ===");

    let store = EntryStore::open(config::entries_path()?);
    let history = HistoryController::new(store);

    let display_index = index.unwrap_or(1);
    let exported = history.export(display_index, out).await?;

    println!(
        "Exported #{display_index} to {} ({})",
        exported.path.display(),
        exported.mime_type
    );
    Ok(())
}
