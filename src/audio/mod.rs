//! Audio device layer.
//!
//! Everything that touches sound hardware or audio files lives here:
//! microphone capture ([`capture`]), probe tone playback ([`playback`]),
//! sweep tone synthesis and loading ([`sweep`]) and ffmpeg re-encoding
//! ([`ffmpeg`]). The session controller drives the hardware exclusively
//! through the [`Capture`] and [`Playback`] traits so it can be tested
//! without devices.

pub mod capture;
pub mod ffmpeg;
pub mod playback;
pub mod sweep;

use thiserror::Error;

pub use capture::{Capture, CaptureSummary, CpalCapture};
pub use playback::{CpalPlayback, Playback};
pub use sweep::{SweepTone, ToneSpec};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Errors from the audio device layer.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Access to the device was refused before any capture began.
    #[error("audio permission denied: {0}")]
    PermissionDenied(String),
    /// The device is missing, busy or failed during configuration/streaming.
    #[error("audio device error: {0}")]
    Device(String),
    /// WAV encoding or decoding failed.
    #[error("wav processing failed: {0}")]
    Wav(#[from] hound::Error),
    /// Format conversion (ffmpeg or tone resampling/decoding) failed.
    #[error("audio conversion failed: {0}")]
    Convert(String),
}

/// Classifies a device-layer failure message. Backends report permission
/// refusals as free text, so this keys off the usual phrasings; everything
/// else counts as a device error.
pub(crate) fn classify_device_error(context: &str, message: String) -> AudioError {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("permission")
        || lowered.contains("denied")
        || lowered.contains("not authorized")
    {
        AudioError::PermissionDenied(message)
    } else {
        AudioError::Device(format!("{context}: {message}"))
    }
}

/// Maps an output format (codec string, first word significant) to the file
/// extension the encoded file should carry.
pub fn extension_for_format(format: &str) -> &'static str {
    let codec = format.split_whitespace().next().unwrap_or("");
    match codec {
        "libopus" | "libvorbis" => "ogg",
        "flac" => "flac",
        "aac" => "m4a",
        "mp3" | "libmp3lame" => "mp3",
        _ => "wav",
    }
}

/// Suggested MIME type for an audio file name, keyed on its extension.
/// Used for uploads and as the hint reported by `export`.
pub fn mime_type_for(file_name: &str) -> &'static str {
    let extension = file_name.rsplit('.').next().unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Runs `f` with stderr redirected to /dev/null to silence ALSA library
/// chatter on Linux. If the redirection cannot be set up, `f` simply runs
/// unsilenced.
#[cfg(target_os = "linux")]
pub fn suppress_alsa_warnings<T>(f: impl FnOnce() -> T) -> T {
    let dev_null = match OpenOptions::new().write(true).open("/dev/null") {
        Ok(file) => file,
        Err(_) => return f(),
    };

    let dev_null_fd = dev_null.as_raw_fd();

    // Save the current stderr file descriptor
    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return f();
    }

    // Redirect stderr to /dev/null
    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return f();
    }

    let result = f();

    // Restore the original stderr
    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// On non-Linux platforms no stderr suppression is needed since ALSA doesn't exist.
#[cfg(not(target_os = "linux"))]
pub fn suppress_alsa_warnings<T>(f: impl FnOnce() -> T) -> T {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_format() {
        assert_eq!(extension_for_format("wav"), "wav");
        assert_eq!(extension_for_format("pcm_s16le"), "wav");
        assert_eq!(extension_for_format("libopus -b:a 32k"), "ogg");
        assert_eq!(extension_for_format("flac"), "flac");
        assert_eq!(extension_for_format("aac"), "m4a");
        assert_eq!(extension_for_format("mp3 -ab 128k"), "mp3");
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for("clip.wav"), "audio/wav");
        assert_eq!(mime_type_for("clip.OGG"), "audio/ogg");
        assert_eq!(mime_type_for("clip.m4a"), "audio/mp4");
        assert_eq!(mime_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn test_classify_device_error() {
        assert!(matches!(
            classify_device_error("open", "Operation not permitted: access denied".into()),
            AudioError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_device_error("open", "device busy".into()),
            AudioError::Device(_)
        ));
    }
}
