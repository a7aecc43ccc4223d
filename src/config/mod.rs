//! Configuration management for echotag.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory; recordings and the entry
//! document live under the user's local data directory.

pub mod file;

pub use file::{
    data_dir, entries_path, get_config_path, recordings_dir, AudioConfig, EchotagConfig,
    SessionConfig, UploadConfig,
};
