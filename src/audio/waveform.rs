//! Waveform data for visualisation.
//!
//! Two consumers live here:
//!
//! * [`WaveformSampler`]: the live tap.  Once per rendering frame it turns a
//!   device [`Snapshot`] into a fixed-length frame of normalised `[-1, 1]`
//!   floats and hands it to a callback.  The frame buffer is allocated once.
//! * [`WaveformData`]: static reductions of a finished clip, with
//!   mean-amplitude bars for playback and per-column min/max envelopes for
//!   line drawing.
//!
//! # Example
//!
//! ```rust
//! use voice_recorder::audio::{Snapshot, WaveformSampler};
//!
//! let mut sampler = WaveformSampler::new(4);
//! sampler.sample(Snapshot::Unsigned8(&[128, 192, 64, 0]));
//! assert_eq!(sampler.frame(), &[0.0, 0.5, -0.5, -1.0]);
//! ```

use super::capture::Snapshot;
use super::quality::finite_sample;

/// Live frame length in samples.
pub const DEFAULT_FRAME_LEN: usize = 1024;

// ---------------------------------------------------------------------------
// WaveformSampler
// ---------------------------------------------------------------------------

type FrameCallback = Box<dyn FnMut(&[f32])>;

/// Normalises live snapshots into a reusable fixed-length frame.
pub struct WaveformSampler {
    frame: Vec<f32>,
    on_frame: Option<FrameCallback>,
}

impl WaveformSampler {
    /// # Panics
    ///
    /// Panics if `frame_len == 0`.
    pub fn new(frame_len: usize) -> Self {
        assert!(frame_len > 0, "waveform frame length must be > 0");
        Self {
            frame: vec![0.0; frame_len],
            on_frame: None,
        }
    }

    /// Install the callback that receives every frame.
    pub fn set_callback(&mut self, on_frame: impl FnMut(&[f32]) + 'static) {
        self.on_frame = Some(Box::new(on_frame));
    }

    pub fn clear_callback(&mut self) {
        self.on_frame = None;
    }

    pub fn has_callback(&self) -> bool {
        self.on_frame.is_some()
    }

    pub fn frame_len(&self) -> usize {
        self.frame.len()
    }

    /// The most recently produced frame.
    pub fn frame(&self) -> &[f32] {
        &self.frame
    }

    /// Normalise `snapshot` into the frame and invoke the callback, if any.
    pub fn sample(&mut self, snapshot: Snapshot<'_>) {
        normalize_into(snapshot, &mut self.frame);
        if let Some(cb) = self.on_frame.as_mut() {
            cb(&self.frame);
        }
    }
}

/// Convert `snapshot` to `[-1, 1]` floats in `out`.
///
/// A longer snapshot contributes its most recent `out.len()` samples; a
/// shorter one is zero-padded at the end.  Bytes map as `(b - 128) / 128`.
pub fn normalize_into(snapshot: Snapshot<'_>, out: &mut [f32]) {
    let n = out.len();
    let written = match snapshot {
        Snapshot::Unsigned8(bytes) => {
            let src = &bytes[bytes.len().saturating_sub(n)..];
            for (o, &b) in out.iter_mut().zip(src) {
                *o = (b as f32 - 128.0) / 128.0;
            }
            src.len()
        }
        Snapshot::Float32(floats) => {
            let src = &floats[floats.len().saturating_sub(n)..];
            for (o, &s) in out.iter_mut().zip(src) {
                *o = finite_sample(s).clamp(-1.0, 1.0);
            }
            src.len()
        }
    };
    out[written..].fill(0.0);
}

// ---------------------------------------------------------------------------
// WaveformData
// ---------------------------------------------------------------------------

/// Static amplitude bars for the playback view.
///
/// Each bar is the mean absolute sample value of an equal-width slice of the
/// clip, clamped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct WaveformData {
    pub bars: Vec<f32>,
}

impl WaveformData {
    /// Compute `num_bars` bars from `audio`.
    ///
    /// Trailing bars are `0.0` when `audio` is shorter than `num_bars`.
    pub fn compute(audio: &[f32], num_bars: usize) -> Self {
        if num_bars == 0 {
            return Self { bars: Vec::new() };
        }

        let per_bar = (audio.len() / num_bars).max(1);

        let mut bars: Vec<f32> = audio
            .chunks(per_bar)
            .take(num_bars)
            .map(|chunk| {
                let sum: f32 = chunk.iter().map(|&s| finite_sample(s).abs()).sum();
                (sum / chunk.len() as f32).min(1.0)
            })
            .collect();
        bars.resize(num_bars, 0.0);

        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Largest bar, useful for normalisation.
    pub fn peak(&self) -> f32 {
        self.bars.iter().cloned().fold(0.0_f32, f32::max)
    }
}

/// `(min, max)` per output column over a live frame, for line drawing.
///
/// Column `i` starts at sample `i * len / width` and spans
/// `max(1, len / width)` samples.
pub fn column_envelope(frame: &[f32], width: usize) -> Vec<(f32, f32)> {
    if frame.is_empty() || width == 0 {
        return Vec::new();
    }
    let len = frame.len();
    let step = (len / width).max(1);

    (0..width)
        .map(|i| {
            let start = i * len / width;
            let end = (start + step).min(len);
            frame[start..end]
                .iter()
                .fold((1.0_f32, -1.0_f32), |(lo, hi), &v| (lo.min(v), hi.max(v)))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn bytes_normalise_around_128() {
        let mut out = [9.0_f32; 3];
        normalize_into(Snapshot::Unsigned8(&[0, 128, 255]), &mut out);
        assert_eq!(out[0], -1.0);
        assert_eq!(out[1], 0.0);
        assert!((out[2] - 127.0 / 128.0).abs() < 1e-6);
    }

    #[test]
    fn floats_are_clamped_and_sanitised() {
        let mut out = [0.0_f32; 4];
        normalize_into(Snapshot::Float32(&[2.0, -3.0, f32::NAN, 0.25]), &mut out);
        assert_eq!(out, [1.0, -1.0, 0.0, 0.25]);
    }

    #[test]
    fn short_snapshot_is_zero_padded() {
        let mut out = [7.0_f32; 4];
        normalize_into(Snapshot::Float32(&[0.5]), &mut out);
        assert_eq!(out, [0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn long_snapshot_keeps_latest() {
        let mut out = [0.0_f32; 2];
        normalize_into(Snapshot::Float32(&[0.1, 0.2, 0.3]), &mut out);
        assert_eq!(out, [0.2, 0.3]);
    }

    #[test]
    fn callback_sees_fixed_length_frames() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut sampler = WaveformSampler::new(8);
        sampler.set_callback(move |frame| sink.borrow_mut().push(frame.len()));
        assert!(sampler.has_callback());

        sampler.sample(Snapshot::Float32(&[0.1; 3]));
        sampler.sample(Snapshot::Unsigned8(&[128; 20]));

        assert_eq!(*seen.borrow(), vec![8, 8]);
        assert_eq!(sampler.frame_len(), 8);
    }

    #[test]
    fn bars_use_mean_absolute_amplitude() {
        let audio: Vec<f32> = (0..1_000).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let w = WaveformData::compute(&audio, 10);
        assert_eq!(w.len(), 10);
        for &b in &w.bars {
            assert!((b - 0.5).abs() < 1e-6, "bar = {b}");
        }
        assert!((w.peak() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn bars_pad_short_audio() {
        let w = WaveformData::compute(&[0.5], 4);
        assert_eq!(w.bars, vec![0.5, 0.0, 0.0, 0.0]);
        assert!(WaveformData::compute(&[0.5; 10], 0).is_empty());
    }

    #[test]
    fn envelope_tracks_min_and_max() {
        let frame = [0.1, -0.4, 0.9, 0.2];
        let cols = column_envelope(&frame, 2);
        assert_eq!(cols, vec![(-0.4, 0.1), (0.2, 0.9)]);
    }

    #[test]
    fn envelope_wider_than_frame() {
        let cols = column_envelope(&[0.3, -0.3], 4);
        assert_eq!(cols.len(), 4);
        assert_eq!(cols[0], (0.3, 0.3));
        assert_eq!(cols[3], (-0.3, -0.3));
        assert!(column_envelope(&[], 10).is_empty());
    }
}
