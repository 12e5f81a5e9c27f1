//! WAV decoding into Whisper-ready PCM.

use std::path::Path;

use hound::{SampleFormat, WavReader};
use thiserror::Error;

use super::resample::{downmix, resample_linear};

/// Sample rate Whisper expects for its input.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Reasons a recording could not be turned into PCM.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The container could not be opened or parsed.
    #[error("failed to read WAV data: {0}")]
    Wav(#[from] hound::Error),

    /// The file extension is not something this decoder handles.
    #[error("unsupported audio format: {0} (only WAV can be decoded locally)")]
    UnsupportedFormat(String),

    /// The file decoded to zero samples.
    #[error("recording contains no audio samples")]
    Empty,
}

// ---------------------------------------------------------------------------
// AudioClip
// ---------------------------------------------------------------------------

/// Mono 16 kHz `f32` audio ready for inference.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    /// Rate of the source file before conversion.
    pub source_rate: u32,
    /// Channel count of the source file before down-mixing.
    pub source_channels: u16,
}

impl AudioClip {
    /// Length of the converted clip in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / WHISPER_SAMPLE_RATE as f32
    }
}

// ---------------------------------------------------------------------------
// load_wav
// ---------------------------------------------------------------------------

/// Decode `path` as WAV and convert it to 16 kHz mono.
///
/// Integer samples are scaled by their bit depth into `[-1.0, 1.0]`; float
/// samples are taken as-is.
pub fn load_wav(path: impl AsRef<Path>) -> Result<AudioClip, AudioError> {
    let path = path.as_ref();

    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    if !is_wav {
        return Err(AudioError::UnsupportedFormat(path.display().to_string()));
    }

    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    if interleaved.is_empty() {
        return Err(AudioError::Empty);
    }

    let mono = downmix(&interleaved, spec.channels);
    let samples = resample_linear(&mono, spec.sample_rate, WHISPER_SAMPLE_RATE);

    log::debug!(
        "audio: decoded {} ({} Hz, {} ch) -> {} samples",
        path.display(),
        spec.sample_rate,
        spec.channels,
        samples.len()
    );

    Ok(AudioClip {
        samples,
        source_rate: spec.sample_rate,
        source_channels: spec.channels,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::tempdir;

    fn write_int_wav(path: &Path, rate: u32, channels: u16, frames: usize) {
        let spec = WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * channels as usize {
            writer.write_sample(i16::MAX / 2).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_stereo_48k_into_mono_16k() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memo.wav");
        write_int_wav(&path, 48_000, 2, 48_000);

        let clip = load_wav(&path).unwrap();
        assert_eq!(clip.source_rate, 48_000);
        assert_eq!(clip.source_channels, 2);
        assert!(clip.samples.len().abs_diff(16_000) <= 1);
        assert!((clip.duration_secs() - 1.0).abs() < 0.01);
        assert!(clip.samples.iter().all(|s| (s - 0.5).abs() < 0.01));
    }

    #[test]
    fn decodes_float_samples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..1_600 {
            writer.write_sample(0.25_f32).unwrap();
        }
        writer.finalize().unwrap();

        let clip = load_wav(&path).unwrap();
        assert_eq!(clip.samples.len(), 1_600);
        assert!((clip.samples[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_wav_extension() {
        let err = load_wav("recording.mp3").unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedFormat(_)));
    }

    #[test]
    fn empty_wav_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_int_wav(&path, 16_000, 1, 0);
        assert!(matches!(load_wav(&path).unwrap_err(), AudioError::Empty));
    }

    #[test]
    fn garbage_file_is_a_wav_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not RIFF").unwrap();
        assert!(matches!(load_wav(&path).unwrap_err(), AudioError::Wav(_)));
    }
}
