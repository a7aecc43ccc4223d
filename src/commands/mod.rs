//! Application command handlers for echotag.
//!
//! This module organizes command handling into separate submodules, each responsible for a specific
//! application command (recording, history operations, configuration).
//!
//! # Commands
//! - `record`: Run a full recording session (room tone, probe sweep, reflections)
//! - `list`: Print the recording history, newest first
//! - `play`: Replay a recording with the system audio player
//! - `export`: Copy a recording to a caller-chosen location
//! - `delete`: Remove a recording and its history entry
//! - `config`: Open configuration file in user's preferred editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod delete;
pub mod export;
pub mod list;
pub mod list_devices;
pub mod logs;
pub mod play;
pub mod record;

pub use config::handle_config;
pub use delete::handle_delete;
pub use export::handle_export;
pub use list::handle_list;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use play::handle_play;
pub use record::handle_record;
