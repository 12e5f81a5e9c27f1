//! Audio loading for the recognition stage.
//!
//! Whisper wants **16 kHz mono `f32`** PCM.  Recorded files arrive in
//! whatever shape the recorder produced, so this module:
//!
//! 1. [`load_wav`] — decodes a WAV file with `hound` (integer or float
//!    samples, any channel count, any rate).
//! 2. [`downmix`] — averages interleaved channels into mono.
//! 3. [`resample_linear`] — converts the mono signal to 16 kHz.
//!
//! ```rust,no_run
//! use voice_to_story::audio::load_wav;
//!
//! let clip = load_wav("memo.wav").unwrap();
//! println!("{:.1}s of speech-ready audio", clip.duration_secs());
//! ```

pub mod decode;
pub mod resample;

pub use decode::{load_wav, AudioClip, AudioError, WHISPER_SAMPLE_RATE};
pub use resample::{downmix, resample_linear};
