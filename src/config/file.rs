//! Configuration file management for echotag.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory, and the well-known data
//! paths (entry document, recordings directory) are derived here as well.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Audio recording configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `echotag list-devices`
    /// - device name from `echotag list-devices`
    pub device: String,
    /// Requested recording sample rate in Hz (the device's native rate wins)
    pub sample_rate: u32,
    /// Output audio format string: "codec [ffmpeg_options]" (e.g., "libopus -b:a 48k").
    /// "wav" writes the capture directly without invoking ffmpeg.
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

fn default_output_format() -> String {
    "wav".to_string()
}

/// Recording sequence timing and probe tone configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Room tone captured before the probe tone plays, in milliseconds
    #[serde(default = "default_ambient_capture_ms")]
    pub ambient_capture_ms: u64,
    /// Extra capture time after the tone ends so reflections land on tape, in milliseconds
    #[serde(default = "default_reflection_buffer_ms")]
    pub reflection_buffer_ms: u64,
    /// Length of the synthesized sweep tone, in milliseconds
    #[serde(default = "default_sweep_duration_ms")]
    pub sweep_duration_ms: u64,
    /// Sweep start frequency in Hz
    #[serde(default = "default_sweep_start_hz")]
    pub sweep_start_hz: f64,
    /// Sweep end frequency in Hz
    #[serde(default = "default_sweep_end_hz")]
    pub sweep_end_hz: f64,
    /// Optional WAV file to play instead of the synthesized sweep
    #[serde(default)]
    pub tone_file: Option<PathBuf>,
}

fn default_ambient_capture_ms() -> u64 {
    1500
}

fn default_reflection_buffer_ms() -> u64 {
    2000
}

fn default_sweep_duration_ms() -> u64 {
    1000
}

fn default_sweep_start_hz() -> f64 {
    200.0
}

fn default_sweep_end_hz() -> f64 {
    8000.0
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ambient_capture_ms: default_ambient_capture_ms(),
            reflection_buffer_ms: default_reflection_buffer_ms(),
            sweep_duration_ms: default_sweep_duration_ms(),
            sweep_start_hz: default_sweep_start_hz(),
            sweep_end_hz: default_sweep_end_hz(),
            tone_file: None,
        }
    }
}

/// Remote upload configuration.
///
/// Leaving `endpoint` or `api_key` empty disables uploads entirely; recordings
/// then stay local only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Base URL of the remote backend, e.g. "https://xyz.supabase.co"
    #[serde(default)]
    pub endpoint: String,
    /// API key sent as both bearer token and apikey header
    #[serde(default)]
    pub api_key: String,
    /// Storage bucket receiving the audio objects
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Table receiving the metadata records
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_bucket() -> String {
    "recordings".to_string()
}

fn default_table() -> String {
    "recordings".to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            bucket: default_bucket(),
            table: default_table(),
        }
    }
}

impl UploadConfig {
    /// Returns a copy with `ECHOTAG_UPLOAD_ENDPOINT` and `ECHOTAG_UPLOAD_API_KEY`
    /// environment overrides applied. Empty variables are ignored.
    pub fn with_env_overrides(&self) -> Self {
        let mut resolved = self.clone();
        if let Ok(endpoint) = std::env::var("ECHOTAG_UPLOAD_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                resolved.endpoint = endpoint;
            }
        }
        if let Ok(api_key) = std::env::var("ECHOTAG_UPLOAD_API_KEY") {
            if !api_key.trim().is_empty() {
                resolved.api_key = api_key;
            }
        }
        resolved
    }

    /// True when both endpoint and api key are present.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchotagConfig {
    pub audio: AudioConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl EchotagConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;
        let config_content = fs::read_to_string(&config_path)?;
        let config: EchotagConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = get_config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }

    /// Returns default configuration values.
    pub fn default_config() -> Self {
        EchotagConfig {
            audio: AudioConfig {
                device: "default".to_string(),
                sample_rate: 48000,
                output_format: default_output_format(),
            },
            session: SessionConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

/// Retrieves the path to the config file.
///
/// Assumes the config file exists (created by setup if needed).
///
/// # Errors
/// - If the config directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> Result<PathBuf, std::io::Error> {
    let config_dir = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not find home directory",
        )
    })?;
    let config_path = config_dir
        .join(".config")
        .join("echotag")
        .join("echotag.toml");

    std::fs::create_dir_all(config_path.parent().unwrap())?;

    Ok(config_path)
}

/// Application data directory (`~/.local/share/echotag`).
///
/// # Errors
/// - If the home directory cannot be determined
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not find home directory",
        )
    })?;
    Ok(home_dir.join(".local").join("share").join("echotag"))
}

/// Path of the JSON document holding the recording entries.
pub fn entries_path() -> Result<PathBuf, std::io::Error> {
    Ok(data_dir()?.join("entries.json"))
}

/// Directory holding the recorded audio files.
pub fn recordings_dir() -> Result<PathBuf, std::io::Error> {
    Ok(data_dir()?.join("recordings"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = EchotagConfig::default_config();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: EchotagConfig = toml::from_str(&rendered).unwrap();

        assert_eq!(parsed.audio.device, "default");
        assert_eq!(parsed.audio.sample_rate, 48000);
        assert_eq!(parsed.audio.output_format, "wav");
        assert_eq!(parsed.session.ambient_capture_ms, 1500);
        assert_eq!(parsed.session.reflection_buffer_ms, 2000);
        assert_eq!(parsed.upload.bucket, "recordings");
        assert_eq!(parsed.upload.table, "recordings");
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let parsed: EchotagConfig = toml::from_str(
            r#"
[audio]
device = "default"
sample_rate = 44100
"#,
        )
        .unwrap();

        assert_eq!(parsed.audio.sample_rate, 44100);
        assert_eq!(parsed.audio.output_format, "wav");
        assert_eq!(parsed.session.sweep_duration_ms, 1000);
        assert_eq!(parsed.session.sweep_start_hz, 200.0);
        assert_eq!(parsed.session.sweep_end_hz, 8000.0);
        assert!(parsed.session.tone_file.is_none());
        assert!(!parsed.upload.is_configured());
    }

    #[test]
    fn test_upload_configured_requires_endpoint_and_key() {
        let mut upload = UploadConfig::default();
        assert!(!upload.is_configured());

        upload.endpoint = "https://x.example".to_string();
        assert!(!upload.is_configured());

        upload.api_key = "key".to_string();
        assert!(upload.is_configured());

        upload.endpoint = "   ".to_string();
        assert!(!upload.is_configured());
    }
}
