//! File-based logging.
//!
//! Commands log through `tracing` into a daily-rolling file under the XDG
//! state directory; nothing goes to the terminal, which belongs to the
//! interactive prompts. Files older than the retention window are pruned at
//! startup, keyed on the date suffix the daily roller stamps into the name.

use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;

/// Base name of the log files; the daily roller appends `.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "echotag.log";

/// Days of logs kept on disk.
const RETENTION_DAYS: i64 = 7;

// The non-blocking writer stops flushing once its guard drops, so the guard
// lives for the whole process.
static APPENDER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Sets up the rolling file logger. Honors `RUST_LOG`; the default level is
/// "info". Calling this twice is an error.
pub fn init_logging() -> Result<(), anyhow::Error> {
    let dir = log_dir()?;
    std::fs::create_dir_all(&dir)?;

    if let Err(err) = prune_old_logs(&dir) {
        eprintln!("Warning: could not prune old logs: {err}");
    }

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, LOG_FILE_PREFIX));
    APPENDER_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging to {}", dir.display());
    Ok(())
}

/// Log directory per the XDG base directory spec: `$XDG_STATE_HOME/echotag`,
/// falling back to `~/.local/state/echotag`.
pub fn log_dir() -> Result<PathBuf, anyhow::Error> {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        if !state_home.trim().is_empty() {
            return Ok(PathBuf::from(state_home).join("echotag"));
        }
    }

    let home = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".local").join("state").join("echotag"))
}

/// Parses the date a rolled log file covers out of its name
/// (`echotag.log.2026-08-28`). The suffix-less current file yields `None`.
pub fn log_file_date(file_name: &str) -> Option<NaiveDate> {
    let suffix = file_name.strip_prefix(LOG_FILE_PREFIX)?.strip_prefix('.')?;
    NaiveDate::parse_from_str(suffix, "%Y-%m-%d").ok()
}

/// Deletes rolled log files dated before the retention window. Files whose
/// names don't carry a parseable date are left alone.
fn prune_old_logs(dir: &PathBuf) -> Result<(), anyhow::Error> {
    let cutoff = Local::now().date_naive() - chrono::Duration::days(RETENTION_DAYS);

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if let Some(date) = log_file_date(name) {
            if date < cutoff {
                if let Err(err) = std::fs::remove_file(&path) {
                    eprintln!("Warning: could not delete {}: {err}", path.display());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_date_parses_rolled_names() {
        assert_eq!(
            log_file_date("echotag.log.2026-08-28"),
            NaiveDate::from_ymd_opt(2026, 8, 28)
        );
        assert_eq!(log_file_date("echotag.log"), None);
        assert_eq!(log_file_date("echotag.log.not-a-date"), None);
        assert_eq!(log_file_date("other.log.2026-08-28"), None);
    }

    #[test]
    fn test_prune_keeps_recent_and_undated_files() {
        let dir = tempfile::tempdir().unwrap();
        let today = Local::now().date_naive();

        let recent = dir
            .path()
            .join(format!("{LOG_FILE_PREFIX}.{}", today.format("%Y-%m-%d")));
        let stale = dir.path().join(format!("{LOG_FILE_PREFIX}.2000-01-01"));
        let undated = dir.path().join(LOG_FILE_PREFIX);
        for path in [&recent, &stale, &undated] {
            std::fs::write(path, "log line\n").unwrap();
        }

        prune_old_logs(&dir.path().to_path_buf()).unwrap();

        assert!(recent.exists());
        assert!(undated.exists());
        assert!(!stale.exists());
    }
}
