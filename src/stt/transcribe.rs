//! Transcription parameters and the [`Transcript`] returned by every
//! [`SttEngine`](super::SttEngine).

use std::time::Duration;

// ---------------------------------------------------------------------------
// SamplingStrategy
// ---------------------------------------------------------------------------

/// Owned, `Clone` mirror of `whisper_rs::SamplingStrategy`.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingStrategy {
    /// Single-pass decoding.
    Greedy { best_of: i32 },
    /// Beam-search decoding; slower, slightly more accurate.
    BeamSearch { beam_size: i32, patience: f32 },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Greedy { best_of: 1 }
    }
}

// ---------------------------------------------------------------------------
// TranscribeParams
// ---------------------------------------------------------------------------

/// Engine-wide inference settings.  The speech language is passed per call.
#[derive(Debug, Clone)]
pub struct TranscribeParams {
    pub strategy: SamplingStrategy,
    /// CPU threads handed to Whisper, capped at 8.
    pub n_threads: i32,
    /// Silence Whisper's progress output on stderr.
    pub suppress_progress: bool,
    pub use_gpu: bool,
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self {
            strategy: SamplingStrategy::default(),
            n_threads: optimal_threads(),
            suppress_progress: true,
            use_gpu: false,
        }
    }
}

pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Output of one recognition call.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    /// Full transcript, trimmed.
    pub text: String,
    /// Mean token probability in `[0, 1]`.
    pub confidence: f32,
    /// Wall-clock time spent inside the engine.
    pub elapsed: Duration,
}

impl Transcript {
    /// Build a transcript, trimming the text and clamping the confidence.
    pub fn new(text: impl Into<String>, confidence: f32, elapsed: Duration) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            text: text.into().trim().to_string(),
            confidence,
            elapsed,
        }
    }
}
