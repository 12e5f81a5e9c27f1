//! Recognition (speech-to-text) collaborator.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  SttEngine (trait)                    │
//! │                                                      │
//! │   recording path ──▶ audio::load_wav ──▶ 16 kHz PCM   │
//! │                                            │          │
//! │                                            ▼          │
//! │                 WhisperEngine::transcribe()           │
//! │                 text + confidence + elapsed           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The workflow only ever sees [`SttEngine`]; [`WhisperEngine`] is the
//! production implementation and [`UnavailableStt`] stands in when no model
//! could be loaded, so a run still produces a diagnosable result.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use voice_to_story::stt::{SttEngine, TranscribeParams, WhisperEngine};
//!
//! let engine = WhisperEngine::load("models/ggml-base.bin", TranscribeParams::default())
//!     .expect("model not found");
//! let transcript = engine.transcribe(Path::new("memo.wav"), "auto").unwrap();
//! println!("{} ({:.2})", transcript.text, transcript.confidence);
//! ```

pub mod engine;
pub mod transcribe;

pub use engine::{SttEngine, SttError, UnavailableStt, WhisperEngine};
pub use transcribe::{SamplingStrategy, TranscribeParams, Transcript};

#[cfg(test)]
pub use engine::MockSttEngine;
