//! List recorded entries, newest first.

use chrono::Local;

use crate::config;
use crate::history::HistoryController;
use crate::store::{Entry, EntryStore};

/// Prints the recording history, most recent first.
///
/// The printed position numbers are what `play`, `export` and `delete` take.
pub async fn handle_list() -> Result<(), anyhow::Error> {
    let store = EntryStore::open(config::entries_path()?);
    let history = HistoryController::new(store);

    let entries = history.refresh().await?;
    print_entries(&entries);
    Ok(())
}

fn print_entries(entries: &[Entry]) {
    if entries.is_empty() {
        println!("No recordings yet. Run 'echotag' to capture one.");
        return;
    }

    println!(
        "{:>3}  {:<17} {:<28} {:<24} {}",
        "#", "RECORDED", "OBJECT", "DESCRIPTION", "REMOTE"
    );

    for (i, entry) in entries.iter().enumerate() {
        let recorded = entry
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
        let object = format!("{} / {} / {}", entry.material, entry.size, entry.shape);
        let remote = if entry.remote_url.is_some() {
            "uploaded"
        } else {
            "local"
        };

        println!(
            "{:>3}  {:<17} {:<28} {:<24} {}",
            i + 1,
            recorded,
            object,
            entry.title(),
            remote
        );
    }
}
