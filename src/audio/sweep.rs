//! Probe tone synthesis and loading.
//!
//! The calibration tone is either synthesized (logarithmic sine sweep) or
//! loaded from a user-supplied WAV file. Either way the result is mono i16
//! PCM at a known sample rate, peak-normalized so playback at unity gain is
//! as loud as the output device allows.

use super::AudioError;
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Length of the raised-cosine fade applied to both ends of a synthesized
/// sweep, to avoid clicks at full volume.
const FADE_MS: f64 = 5.0;

/// A rendered probe tone: mono i16 PCM.
#[derive(Debug, Clone)]
pub struct SweepTone {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl SweepTone {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Loads a tone from a WAV file: mixes to mono and peak-normalizes.
    ///
    /// # Errors
    /// - If the file cannot be opened or decoded
    /// - If the sample format is unsupported or the file holds no samples
    pub fn from_wav(path: &Path) -> Result<Self, AudioError> {
        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels as usize;

        let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            (SampleFormat::Int, bits) if bits <= 32 => {
                let scale = (1i64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|s| s as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
            (format, bits) => {
                return Err(AudioError::Convert(format!(
                    "unsupported tone file format in {}: {bits}-bit {format:?}",
                    path.display()
                )))
            }
        };

        if interleaved.is_empty() {
            return Err(AudioError::Convert(format!(
                "tone file {} holds no samples",
                path.display()
            )));
        }

        // Mix down to mono by averaging channels
        let mono: Vec<f32> = if channels <= 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        let tone = Self {
            samples: normalize_to_i16(&mono),
            sample_rate: spec.sample_rate,
        };

        debug!(
            "Loaded tone file {}: {:.2}s at {}Hz",
            path.display(),
            tone.duration().as_secs_f64(),
            tone.sample_rate
        );

        Ok(tone)
    }

    /// Returns this tone resampled to `target_rate` via linear interpolation.
    pub fn resampled(&self, target_rate: u32) -> Self {
        if target_rate == self.sample_rate || self.samples.is_empty() {
            return Self {
                samples: self.samples.clone(),
                sample_rate: target_rate,
            };
        }

        let step = self.sample_rate as f64 / target_rate as f64;
        let out_len = (self.samples.len() as f64 / step).round() as usize;
        let last = self.samples.len() - 1;

        let mut samples = Vec::with_capacity(out_len);
        for i in 0..out_len {
            let position = i as f64 * step;
            let index = (position as usize).min(last);
            let next = (index + 1).min(last);
            let frac = (position - index as f64) as f32;

            let a = self.samples[index] as f32;
            let b = self.samples[next] as f32;
            samples.push((a + (b - a) * frac) as i16);
        }

        Self {
            samples,
            sample_rate: target_rate,
        }
    }
}

/// Configuration of the probe tone, resolved before each session.
#[derive(Debug, Clone)]
pub struct ToneSpec {
    /// Length of a synthesized sweep; also the fallback duration estimate
    /// when a tone file cannot be read.
    pub duration: Duration,
    pub start_hz: f64,
    pub end_hz: f64,
    /// When set, load this WAV instead of synthesizing.
    pub file: Option<PathBuf>,
}

impl ToneSpec {
    /// Renders the tone at `sample_rate`, synthesizing or loading per the
    /// spec. File tones are resampled to the requested rate.
    ///
    /// # Errors
    /// - If a configured tone file cannot be loaded
    pub fn prepare(&self, sample_rate: u32) -> Result<SweepTone, AudioError> {
        match &self.file {
            Some(path) => Ok(SweepTone::from_wav(path)?.resampled(sample_rate)),
            None => Ok(synthesize(sample_rate, self.duration, self.start_hz, self.end_hz)),
        }
    }

    /// Duration to assume when the tone could not be prepared or played;
    /// keeps the auto-stop timer armed so a session always terminates.
    pub fn nominal_duration(&self) -> Duration {
        self.duration
    }
}

/// Synthesizes a logarithmic sine sweep from `start_hz` to `end_hz`, faded
/// at both ends and peak-normalized to full scale.
pub fn synthesize(sample_rate: u32, duration: Duration, start_hz: f64, end_hz: f64) -> SweepTone {
    let total = duration.as_secs_f64();
    let count = (sample_rate as f64 * total).round() as usize;

    // Degenerate bands fall back to a constant-frequency tone
    let start_hz = start_hz.max(1.0);
    let end_hz = end_hz.max(start_hz);
    let k = (end_hz / start_hz).ln();

    let fade_samples = ((FADE_MS / 1000.0) * sample_rate as f64).round() as usize;
    let fade_samples = fade_samples.min(count / 2);

    let mut rendered = Vec::with_capacity(count);
    for i in 0..count {
        let t = i as f64 / sample_rate as f64;

        let phase = if k.abs() < f64::EPSILON {
            std::f64::consts::TAU * start_hz * t
        } else {
            std::f64::consts::TAU * start_hz * total / k * ((t * k / total).exp() - 1.0)
        };

        let fade = fade_gain(i, count, fade_samples);
        rendered.push((phase.sin() * fade) as f32);
    }

    SweepTone {
        samples: normalize_to_i16(&rendered),
        sample_rate,
    }
}

fn fade_gain(index: usize, count: usize, fade_samples: usize) -> f64 {
    if fade_samples == 0 {
        return 1.0;
    }

    let ramp = |position: f64| 0.5 - 0.5 * (std::f64::consts::PI * position).cos();

    if index < fade_samples {
        ramp(index as f64 / fade_samples as f64)
    } else if index >= count - fade_samples {
        ramp((count - 1 - index) as f64 / fade_samples as f64)
    } else {
        1.0
    }
}

fn normalize_to_i16(samples: &[f32]) -> Vec<i16> {
    let peak = samples
        .iter()
        .fold(0.0f32, |acc, &sample| acc.max(sample.abs()));

    let gain = if peak > 0.0 { 1.0 / peak } else { 0.0 };

    samples
        .iter()
        .map(|&sample| (sample * gain * i16::MAX as f32) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_length_matches_duration() {
        let tone = synthesize(48_000, Duration::from_millis(1000), 200.0, 8000.0);
        assert_eq!(tone.samples.len(), 48_000);
        assert_eq!(tone.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_synthesized_sweep_is_peak_normalized_and_faded() {
        let tone = synthesize(48_000, Duration::from_millis(500), 200.0, 8000.0);

        let peak = tone.samples.iter().map(|s| s.unsigned_abs()).max().unwrap();
        assert!(peak > 30_000, "peak {peak} should be near full scale");

        // Fade keeps the very edges quiet
        assert!(tone.samples[0].unsigned_abs() < 1_000);
        assert!(tone.samples.last().unwrap().unsigned_abs() < 1_000);
    }

    #[test]
    fn test_resample_halves_sample_count() {
        let tone = synthesize(48_000, Duration::from_millis(100), 200.0, 2000.0);
        let down = tone.resampled(24_000);
        assert_eq!(down.sample_rate, 24_000);
        let expected = tone.samples.len() / 2;
        assert!((down.samples.len() as i64 - expected as i64).abs() <= 1);
    }

    #[test]
    fn test_from_wav_mixes_stereo_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..441 {
            writer.write_sample(10_000i16).unwrap();
            writer.write_sample(-10_000i16).unwrap();
        }
        writer.finalize().unwrap();

        let tone = SweepTone::from_wav(&path).unwrap();
        assert_eq!(tone.sample_rate, 44_100);
        assert_eq!(tone.samples.len(), 441);
        // Opposite-phase channels cancel to silence
        assert!(tone.samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_prepare_falls_back_to_synthesis_without_file() {
        let spec = ToneSpec {
            duration: Duration::from_millis(250),
            start_hz: 200.0,
            end_hz: 8000.0,
            file: None,
        };
        let tone = spec.prepare(16_000).unwrap();
        assert_eq!(tone.samples.len(), 4_000);
    }

    #[test]
    fn test_prepare_unreadable_file_errors() {
        let spec = ToneSpec {
            duration: Duration::from_millis(250),
            start_hz: 200.0,
            end_hz: 8000.0,
            file: Some(PathBuf::from("/nonexistent/tone.wav")),
        };
        assert!(spec.prepare(16_000).is_err());
    }
}
