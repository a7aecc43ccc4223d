//! Setup module for initial application configuration.
//!
//! Handles first-run setup by writing a default config file and creating the
//! local data layout (entry document directory, recordings directory).

pub mod version;

use anyhow::anyhow;

use crate::config::{self, EchotagConfig};

/// Current application version from Cargo.toml
const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs the setup process.
///
/// Writes the default config file (only when none exists yet; migrations keep
/// the user's settings and just restamp the version line) and creates the data
/// directories recordings are saved into.
///
/// # Errors
/// Returns an error if any file operations fail.
pub fn run_setup() -> anyhow::Result<()> {
    // Create config directory
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("echotag");
    std::fs::create_dir_all(&config_dir)?;

    // Write main config file with version prefix, unless the user already has one
    let config_path = config_dir.join("echotag.toml");
    if !config_path.exists() {
        let rendered = toml::to_string_pretty(&EchotagConfig::default_config())?;
        let full_config = format!(
            "config_version = \"{}\"\n\n{}",
            CURRENT_VERSION, rendered
        );
        std::fs::write(&config_path, full_config)?;
        tracing::info!("Wrote default config to {}", config_path.display());
    }

    // Create the data layout
    std::fs::create_dir_all(config::data_dir()?)?;
    std::fs::create_dir_all(config::recordings_dir()?)?;

    Ok(())
}
