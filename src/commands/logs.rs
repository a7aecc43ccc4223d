//! Show the tail of the application log.

use std::fs;
use std::path::PathBuf;

use crate::logging::{self, LOG_FILE_PREFIX};

const DEFAULT_LINES: usize = 50;

/// Prints the last `lines` lines (default 50) of the newest log file.
///
/// "Newest" is decided by the date stamped into the rolled file name; the
/// suffix-less file the current process writes to always wins.
pub fn handle_logs(lines: Option<usize>) -> Result<(), anyhow::Error> {
    let dir = logging::log_dir()?;
    let wanted = lines.unwrap_or(DEFAULT_LINES);

    let Some(log_file) = newest_log_file(&dir)? else {
        println!("No logs yet under {}.", dir.display());
        println!("Run 'echotag' or another command to generate some.");
        return Ok(());
    };

    let content = fs::read_to_string(&log_file)?;
    if content.is_empty() {
        println!("Log file is empty: {}", log_file.display());
        return Ok(());
    }

    let all: Vec<&str> = content.lines().collect();
    let tail = &all[all.len().saturating_sub(wanted)..];

    if tail.len() < all.len() {
        println!(
            "Last {} of {} lines from {}:",
            tail.len(),
            all.len(),
            log_file.display()
        );
    } else {
        println!("All {} lines from {}:", all.len(), log_file.display());
    }
    println!();
    for line in tail {
        println!("{line}");
    }

    Ok(())
}

/// Finds the log file covering the most recent day, or `None` when the
/// directory is missing or holds no log files.
fn newest_log_file(dir: &PathBuf) -> Result<Option<PathBuf>, anyhow::Error> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let mut best: Option<(Option<chrono::NaiveDate>, PathBuf)> = None;
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(LOG_FILE_PREFIX) {
            continue;
        }

        // The undated current file sorts above every rolled one
        let rank = match logging::log_file_date(name) {
            Some(date) => Some(date),
            None if name == LOG_FILE_PREFIX => None,
            None => continue,
        };

        let newer = match &best {
            None => true,
            Some((Some(current), _)) => rank.map_or(true, |date| date > *current),
            Some((None, _)) => false,
        };
        if newer {
            best = Some((rank, path));
        }
    }

    Ok(best.map(|(_, path)| path))
}
