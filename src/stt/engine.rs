//! Recognition engine trait and implementations.
//!
//! [`SttEngine`] is object-safe and `Send + Sync` so the workflow can hold it
//! behind an `Arc<dyn SttEngine>` and call it from the blocking thread pool.
//!
//! [`WhisperEngine`] wraps a `whisper_rs::WhisperContext`.  [`MockSttEngine`]
//! (under `#[cfg(test)]`) returns a canned transcript without a model file.

use std::path::Path;
use std::time::Instant;

use thiserror::Error;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters, WhisperState};

use crate::audio::{self, AudioError};
use crate::stt::transcribe::{SamplingStrategy, TranscribeParams, Transcript};

/// Confidence reported when Whisper produced no token data to average.
const DEFAULT_CONFIDENCE: f32 = 0.8;

/// Minimum clip length: 0.5 s × 16 000 Hz.
const MIN_AUDIO_SAMPLES: usize = 8_000;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// Errors raised by recognition engines.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The GGML model file was not found at the given path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// `whisper_rs` failed to initialise a context or state.
    #[error("Whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// The recording could not be decoded.
    #[error("Audio decoding failed: {0}")]
    Audio(String),

    /// The decoded clip is shorter than 0.5 s.
    #[error("Audio too short: minimum 0.5 s (8 000 samples at 16 kHz)")]
    AudioTooShort,

    /// An error occurred during the inference pass.
    #[error("Transcription error: {0}")]
    Transcription(String),
}

impl From<AudioError> for SttError {
    fn from(e: AudioError) -> Self {
        SttError::Audio(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// SttEngine trait
// ---------------------------------------------------------------------------

/// Recognition capability consumed by the workflow's first stage.
///
/// May block for the whole inference; callers run it on a blocking thread.
pub trait SttEngine: Send + Sync {
    /// Transcribe the recording at `source` in `language` (`"auto"` allowed).
    fn transcribe(&self, source: &Path, language: &str) -> Result<Transcript, SttError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SttEngine>) {}
};

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production engine backed by whisper.cpp.
///
/// A fresh `WhisperState` is created per call, so one engine can serve
/// concurrent runs without locking.
pub struct WhisperEngine {
    ctx: WhisperContext,
    params: TranscribeParams,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs; the model
// weights are read-only after loading.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model from `model_path`.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`] — `model_path` does not exist.
    /// - [`SttError::ContextInit`]  — whisper-rs failed to load the file.
    pub fn load(model_path: impl AsRef<Path>, params: TranscribeParams) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu = params.use_gpu;
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        log::info!("stt: loaded Whisper model {}", path.display());
        Ok(Self { ctx, params })
    }

    /// Run inference over already-decoded 16 kHz mono samples.
    pub fn transcribe_samples(&self, audio: &[f32], language: &str) -> Result<Transcript, SttError> {
        if audio.len() < MIN_AUDIO_SAMPLES {
            return Err(SttError::AudioTooShort);
        }

        use whisper_rs::SamplingStrategy as WS;
        let ws = match self.params.strategy {
            SamplingStrategy::Greedy { best_of } => WS::Greedy { best_of },
            SamplingStrategy::BeamSearch { beam_size, patience } => {
                WS::BeamSearch { beam_size, patience }
            }
        };

        let mut fp = FullParams::new(ws);
        let lang = if language == "auto" { None } else { Some(language) };
        fp.set_language(lang);
        fp.set_n_threads(self.params.n_threads);
        if self.params.suppress_progress {
            fp.set_print_progress(false);
            fp.set_print_realtime(false);
        }

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        let started = Instant::now();
        state
            .full(fp, audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut text = String::new();
        for i in 0..n_segments {
            let segment = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;
            text.push_str(&segment);
        }

        let confidence = mean_token_probability(&state, n_segments).unwrap_or(DEFAULT_CONFIDENCE);
        Ok(Transcript::new(text, confidence, started.elapsed()))
    }
}

/// Mean probability over every token of every segment, `None` when Whisper
/// exposes no tokens.
fn mean_token_probability(state: &WhisperState, n_segments: i32) -> Option<f32> {
    let mut sum = 0.0_f64;
    let mut count = 0_u32;
    for seg in 0..n_segments {
        let n_tokens = state.full_n_tokens(seg).unwrap_or(0);
        for tok in 0..n_tokens {
            if let Ok(p) = state.full_get_token_prob(seg, tok) {
                sum += p as f64;
                count += 1;
            }
        }
    }
    (count > 0).then(|| (sum / count as f64) as f32)
}

impl SttEngine for WhisperEngine {
    fn transcribe(&self, source: &Path, language: &str) -> Result<Transcript, SttError> {
        let clip = audio::load_wav(source)?;
        self.transcribe_samples(&clip.samples, language)
    }
}

// ---------------------------------------------------------------------------
// UnavailableStt
// ---------------------------------------------------------------------------

/// Stand-in used when no Whisper model could be loaded; every call fails
/// with [`SttError::ModelNotFound`] so the run records why.
#[derive(Debug, Clone)]
pub struct UnavailableStt {
    pub model_path: String,
}

impl SttEngine for UnavailableStt {
    fn transcribe(&self, _source: &Path, _language: &str) -> Result<Transcript, SttError> {
        Err(SttError::ModelNotFound(self.model_path.clone()))
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// Test double returning a pre-configured response.
#[cfg(test)]
pub struct MockSttEngine {
    response: Result<Transcript, SttError>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSttEngine {
    /// Always returns `text` with the given confidence.
    pub fn ok(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            response: Ok(Transcript::new(text, confidence, std::time::Duration::ZERO)),
            calls: Default::default(),
        }
    }

    /// Always returns `error`.
    pub fn err(error: SttError) -> Self {
        Self {
            response: Err(error),
            calls: Default::default(),
        }
    }

    /// Report `elapsed` as the engine's inference time.
    pub fn with_elapsed(mut self, elapsed: std::time::Duration) -> Self {
        if let Ok(transcript) = &mut self.response {
            transcript.elapsed = elapsed;
        }
        self
    }

    /// Number of `transcribe` calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl SttEngine for MockSttEngine {
    fn transcribe(&self, _source: &Path, _language: &str) -> Result<Transcript, SttError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
