//! Voice-to-story: turn a spoken recording into a cleaned, structured and
//! hashtagged story.
//!
//! * [`stt`] — speech recognition behind the [`stt::SttEngine`] trait.
//! * [`llm`] — text transformation behind the [`llm::TextTransformer`] trait.
//! * [`story`] — document, filler and hashtag rules shared by the stages.
//! * [`pipeline`] — state record, stages, quality gate, graph engine and
//!   fallback; [`pipeline::VoiceWorkflow`] is the entry point.
//! * [`config`] / [`audio`] — settings and WAV decoding.

pub mod audio;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod story;
pub mod stt;
