//! Channel mixing and sample-rate conversion.
//!
//! Linear interpolation is used for rate conversion.  Speech recognition is
//! tolerant of the mild aliasing this introduces and it keeps the decoder
//! free of a DSP dependency.

/// Average interleaved multi-channel audio into a mono signal.
///
/// * `channels == 1` copies the input.
/// * `channels == 0` yields an empty signal.
/// * A trailing partial frame is dropped.
///
/// ```rust
/// use voice_to_story::audio::downmix;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = downmix(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let width = n as usize;
            samples
                .chunks_exact(width)
                .map(|frame| frame.iter().sum::<f32>() / width as f32)
                .collect()
        }
    }
}

/// Convert a mono signal from `from_rate` Hz to `to_rate` Hz.
///
/// Equal rates and empty input are returned unchanged.  A zero rate on
/// either side yields an empty signal.
///
/// ```rust
/// use voice_to_story::audio::resample_linear;
///
/// let hi = vec![0.25_f32; 480]; // 10 ms @ 48 kHz
/// assert_eq!(resample_linear(&hi, 48_000, 16_000).len(), 160);
/// ```
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == 0 || to_rate == 0 {
        return Vec::new();
    }
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / step).ceil() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            match samples.get(idx + 1) {
                Some(next) => samples[idx] + (next - samples[idx]) * frac,
                None => samples[idx],
            }
        })
        .collect()
}
