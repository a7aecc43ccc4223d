//! Microphone capture.
//!
//! Captures i16 PCM from a cpal input device, mixes it down to mono and
//! flushes it to disk as WAV (optionally re-encoded through ffmpeg). The
//! session controller talks to the [`Capture`] trait; [`CpalCapture`] is the
//! production implementation.

use super::{classify_device_error, ffmpeg, suppress_alsa_warnings, AudioError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::WavWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Microphone resource as the session controller sees it.
pub trait Capture {
    /// Probes device availability without acquiring it, so permission
    /// problems surface before a session touches any hardware.
    fn ensure_permission(&self) -> Result<(), AudioError>;

    /// Acquires the device and starts capturing.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stops capturing, writes the audio to `output_path` and releases the
    /// device.
    fn finish(&mut self, output_path: &Path) -> Result<CaptureSummary, AudioError>;

    /// Releases the device and discards everything captured so far.
    fn abort(&mut self);

    /// Whether the device is currently held and capturing.
    fn is_active(&self) -> bool;

    /// A device failure observed since `start`, if any.
    fn failure(&self) -> Option<String>;
}

/// What a finished capture produced.
#[derive(Debug, Clone)]
pub struct CaptureSummary {
    pub duration_secs: f32,
    pub sample_count: usize,
    pub sample_rate: u32,
}

/// Records audio from a specified or default input device.
///
/// Captures at the device's native sample rate, converts multi-channel audio
/// to mono by averaging channels, and saves via hound (plus ffmpeg when a
/// non-WAV output format is configured).
pub struct CpalCapture {
    /// Actual recording sample rate from device
    sample_rate: u32,
    /// Recorded audio samples (i16 PCM mono)
    samples: Arc<Mutex<Vec<i16>>>,
    /// Active audio input stream (kept alive while capturing)
    stream: Option<cpal::Stream>,
    /// Device name or "default" to use the system default device
    device_name: String,
    /// Output codec string, e.g. "wav" or "libopus -b:a 32k"
    output_format: String,
    /// First stream error reported by the device callback
    stream_failure: Arc<Mutex<Option<String>>>,
}

impl CpalCapture {
    /// Creates a capture for the given device. The actual sample rate may
    /// differ from `requested_sample_rate`; the device's native rate wins.
    pub fn new(requested_sample_rate: u32, device_name: String, output_format: String) -> Self {
        Self {
            sample_rate: requested_sample_rate,
            samples: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            device_name,
            output_format,
            stream_failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the actual sample rate once capture has started.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn resolve_device(&self) -> Result<cpal::Device, AudioError> {
        suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| AudioError::Device("no audio input device available".into()))
            } else {
                find_device_by_name(&host, &self.device_name)
            }
        })
    }

    /// Saves audio samples as a mono 16-bit WAV file.
    fn save_wav(&self, samples: &[i16], path: &Path) -> Result<(), AudioError> {
        let wav_spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, wav_spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        debug!("WAV written: {}", path.display());
        Ok(())
    }

    /// Converts multi-channel callback data to mono and appends it.
    fn handle_audio_callback(data: &[i16], samples_arc: &Arc<Mutex<Vec<i16>>>, num_channels: usize) {
        let mut samples = samples_arc.lock().unwrap();

        match num_channels {
            1 => {
                samples.extend_from_slice(data);
            }
            2 => {
                for chunk in data.chunks_exact(2) {
                    let left = chunk[0] as i32;
                    let right = chunk[1] as i32;
                    samples.push(((left + right) / 2) as i16);
                }
            }
            _ => {
                for chunk in data.chunks_exact(num_channels) {
                    let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                    samples.push((sum / num_channels as i32) as i16);
                }
            }
        }
    }

    fn create_temp_wav_path(&self) -> PathBuf {
        std::env::temp_dir().join(format!("echotag_{}.wav", std::process::id()))
    }

    fn writes_wav_directly(&self) -> bool {
        let codec = self.output_format.split_whitespace().next().unwrap_or("wav");
        matches!(codec, "wav" | "pcm_s16le")
    }
}

impl Capture for CpalCapture {
    fn ensure_permission(&self) -> Result<(), AudioError> {
        let device = self.resolve_device()?;
        device
            .default_input_config()
            .map_err(|err| classify_device_error("input device probe", err.to_string()))?;
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        let device = self.resolve_device()?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        info!("Recording device: {}", device_name);

        let device_config = device
            .default_input_config()
            .map_err(|err| classify_device_error("input device config", err.to_string()))?;
        let device_sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;

        if device_sample_rate != self.sample_rate {
            warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
                self.sample_rate, device_sample_rate
            );
        }

        debug!(
            "Device configuration: {}Hz, {} channels",
            device_sample_rate, num_channels
        );

        self.sample_rate = device_sample_rate;
        self.samples.lock().unwrap().clear();
        *self.stream_failure.lock().unwrap() = None;

        let samples_arc = Arc::clone(&self.samples);
        let failure_arc = Arc::clone(&self.stream_failure);
        let callback_channels = num_channels;

        let stream = device
            .build_input_stream(
                &device_config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    Self::handle_audio_callback(data, &samples_arc, callback_channels);
                },
                move |err| {
                    tracing::error!("Audio input stream error: {}", err);
                    let mut slot = failure_arc.lock().unwrap();
                    if slot.is_none() {
                        *slot = Some(err.to_string());
                    }
                },
                None,
            )
            .map_err(|err| classify_device_error("input stream setup", err.to_string()))?;

        stream
            .play()
            .map_err(|err| classify_device_error("input stream start", err.to_string()))?;
        self.stream = Some(stream);

        debug!("Audio capture started");
        Ok(())
    }

    fn finish(&mut self, output_path: &Path) -> Result<CaptureSummary, AudioError> {
        // Dropping the stream releases the device
        self.stream = None;

        let samples = self.samples.lock().unwrap().clone();
        let sample_count = samples.len();
        let duration_secs = sample_count as f32 / self.sample_rate as f32;

        if sample_count == 0 {
            warn!("Capture finished with no samples; writing an empty file");
        } else {
            info!(
                "Capture finished: {:.2}s ({} samples at {}Hz)",
                duration_secs, sample_count, self.sample_rate
            );
        }

        if self.writes_wav_directly() {
            self.save_wav(&samples, output_path)?;
        } else {
            let temp_wav = self.create_temp_wav_path();
            self.save_wav(&samples, &temp_wav)?;
            let converted = ffmpeg::convert(&temp_wav, output_path, &self.output_format);

            if let Err(err) = std::fs::remove_file(&temp_wav) {
                debug!("Failed to remove temp file: {}", err);
            }
            converted?;
        }

        match std::fs::metadata(output_path) {
            Ok(meta) => info!(
                "Audio saved: {} ({} bytes, format: {})",
                output_path.display(),
                meta.len(),
                self.output_format
            ),
            Err(_) => info!("Audio saved: {}", output_path.display()),
        }

        Ok(CaptureSummary {
            duration_secs,
            sample_count,
            sample_rate: self.sample_rate,
        })
    }

    fn abort(&mut self) {
        self.stream = None;
        self.samples.lock().unwrap().clear();
        debug!("Capture aborted; samples discarded");
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    fn failure(&self) -> Option<String> {
        self.stream_failure.lock().unwrap().clone()
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stream = None;
    }
}

/// Finds an audio input device by name or numeric index.
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device, AudioError> {
    // Try to parse as a numeric index first
    if let Ok(index) = device_spec.parse::<usize>() {
        let devices: Vec<_> = host
            .input_devices()
            .map_err(|err| AudioError::Device(format!("failed to enumerate devices: {err}")))?
            .collect();

        if index < devices.len() {
            return devices.into_iter().nth(index).ok_or_else(|| {
                AudioError::Device(format!("device index {index} disappeared during enumeration"))
            });
        }
        return Err(AudioError::Device(format!(
            "device index {} is out of range (0-{})",
            index,
            devices.len().saturating_sub(1)
        )));
    }

    // Try to find by name
    let devices = host
        .input_devices()
        .map_err(|err| AudioError::Device(format!("failed to enumerate devices: {err}")))?;

    for device in devices {
        if let Ok(name) = device.name() {
            if name == device_spec {
                return Ok(device);
            }
        }
    }

    Err(AudioError::Device(format!(
        "audio input device '{device_spec}' not found. Use 'echotag list-devices' to see available devices."
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_capture_is_inactive() {
        let capture = CpalCapture::new(48_000, "default".to_string(), "wav".to_string());
        assert!(!capture.is_active());
        assert!(capture.failure().is_none());
    }

    #[test]
    fn test_wav_formats_skip_ffmpeg() {
        let wav = CpalCapture::new(48_000, "default".to_string(), "wav".to_string());
        assert!(wav.writes_wav_directly());

        let pcm = CpalCapture::new(48_000, "default".to_string(), "pcm_s16le".to_string());
        assert!(pcm.writes_wav_directly());

        let opus = CpalCapture::new(48_000, "default".to_string(), "libopus -b:a 32k".to_string());
        assert!(!opus.writes_wav_directly());
    }

    #[test]
    fn test_abort_discards_samples() {
        let mut capture = CpalCapture::new(48_000, "default".to_string(), "wav".to_string());
        capture.samples.lock().unwrap().extend_from_slice(&[1, 2, 3]);
        capture.abort();
        assert!(capture.samples.lock().unwrap().is_empty());
    }
}
