//! echotag: record and catalog echo signatures of household objects.
//!
//! Each recording session captures a stretch of room tone, plays a sine sweep
//! through the speaker, and keeps recording while the echo decays. Takes are
//! tagged, stored locally as an ordered JSON document plus audio files, and
//! optionally mirrored to a remote backend in the background.

pub mod app;
pub mod audio;
pub mod commands;
pub mod config;
pub mod history;
pub mod logging;
pub mod session;
pub mod setup;
pub mod store;
pub mod upload;
