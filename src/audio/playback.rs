//! Probe tone playback.
//!
//! Plays a rendered [`SweepTone`] through the default cpal output device at
//! unity gain. The tone is peak-normalized at synthesis time, so unity gain
//! here means the loudest the device will go without clipping.

use super::{classify_device_error, suppress_alsa_warnings, AudioError, SweepTone, ToneSpec};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::time::Duration;
use tracing::{debug, info};

/// Speaker resource as the session controller sees it.
pub trait Playback {
    /// Renders the configured tone and starts playing it. Returns the actual
    /// tone duration so the caller can arm its auto-stop timer.
    fn play(&mut self, spec: &ToneSpec) -> Result<Duration, AudioError>;

    /// Stops playback and releases the output device.
    fn stop(&mut self);

    /// Whether the output device is currently held.
    fn is_playing(&self) -> bool;
}

/// Plays tones through the system default output device.
pub struct CpalPlayback {
    stream: Option<cpal::Stream>,
}

impl CpalPlayback {
    pub fn new() -> Self {
        Self { stream: None }
    }

    fn start_stream(&mut self, tone: SweepTone) -> Result<(), AudioError> {
        let (device, config) = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| AudioError::Device("no audio output device available".into()))?;
            let config = device
                .default_output_config()
                .map_err(|err| classify_device_error("output device config", err.to_string()))?;
            Ok::<_, AudioError>((device, config))
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        debug!("Playback device: {}", device_name);

        let stream_config: cpal::StreamConfig = config.into();
        let channels = stream_config.channels as usize;
        let rendered = tone.resampled(stream_config.sample_rate.0);
        let samples = rendered.samples;
        let mut position = 0usize;

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        // Past the end of the tone, keep emitting silence
                        let value = samples
                            .get(position)
                            .map(|&sample| sample as f32 / 32_768.0)
                            .unwrap_or(0.0);
                        if position < samples.len() {
                            position += 1;
                        }
                        for out in frame.iter_mut() {
                            *out = value;
                        }
                    }
                },
                |err| {
                    tracing::error!("Audio output stream error: {}", err);
                },
                None,
            )
            .map_err(|err| classify_device_error("output stream setup", err.to_string()))?;

        stream
            .play()
            .map_err(|err| classify_device_error("output stream start", err.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }
}

impl Default for CpalPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl Playback for CpalPlayback {
    fn play(&mut self, spec: &ToneSpec) -> Result<Duration, AudioError> {
        // Render at a nominal rate first to learn the duration; the stream
        // resamples to the device rate.
        let tone = spec.prepare(44_100)?;
        let duration = tone.duration();

        self.start_stream(tone)?;
        info!(
            "Probe tone playing: {:.2}s at full volume",
            duration.as_secs_f64()
        );
        Ok(duration)
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!("Tone playback stopped");
        }
    }

    fn is_playing(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CpalPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_playback_is_idle() {
        let mut playback = CpalPlayback::new();
        assert!(!playback.is_playing());
        // Stopping without a stream is a no-op
        playback.stop();
        assert!(!playback.is_playing());
    }

    #[test]
    fn test_play_and_stop_when_device_available() {
        // May be skipped in CI environments without audio devices
        let spec = ToneSpec {
            duration: Duration::from_millis(100),
            start_hz: 200.0,
            end_hz: 2000.0,
            file: None,
        };

        let mut playback = CpalPlayback::new();
        if playback.play(&spec).is_ok() {
            assert!(playback.is_playing());
            playback.stop();
            assert!(!playback.is_playing());
        }
    }
}
