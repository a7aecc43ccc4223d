//! Play back a previous recording using the system audio player.

use crate::config;
use crate::history::HistoryController;
use crate::store::EntryStore;

/// Plays a recording through the system's default audio player.
///
/// On macOS: uses the `open` command
/// On Linux: tries xdg-open first, then common audio players (mpv, vlc, ffplay, paplay)
///
/// # Arguments
/// * `index` - Optional recording position (1 = most recent, None = most recent)
pub async fn handle_play(index: Option<usize>) -> Result<(), anyhow::Error> {
    tracing::info!("=== echotag Play Command ===");

    let store = EntryStore::open(config::entries_path()?);
    let history = HistoryController::new(store);

    let display_index = index.unwrap_or(1);
    let entry = history.play(display_index).await?;

    println!("Played #{display_index}: {}", entry.file_name);
    Ok(())
}
