//! Audio core: capture taps → accumulation → analysis → WAV.
//!
//! # Pipeline
//!
//! ```text
//!                ┌─ read_block ──▶ ChunkBuffer ──stop──▶ MergedRecording
//! CaptureDevice ─┤                                        ├─▶ analyze → AnalysisReport
//!                │                                        └─▶ wav::encode → bytes
//!                └─ read_snapshot ─▶ WaveformSampler ─▶ callback (per frame)
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use voice_recorder::audio::{analyze, wav};
//!
//! let samples = vec![0.25_f32; 16_000];
//! let report = analyze(&samples, 16_000);
//! assert!(report.is_valid);
//!
//! let bytes = wav::encode(&samples, 16_000);
//! assert_eq!(bytes.len(), 44 + 32_000);
//! ```

pub mod buffer;
pub mod capture;
pub mod quality;
pub mod replay;
pub mod waveform;
pub mod wav;

pub use buffer::{ChunkBuffer, MergedRecording, RingBuffer};
pub use capture::{CaptureConstraints, CaptureDevice, CaptureError, CpalDevice, Snapshot};
pub use quality::{
    analyze, AnalysisReport, AudioQuality, Issue, IssueKind, CLIPPING_PEAK, MAX_DURATION_SECS,
    MAX_SILENCE_RATIO, MIN_DURATION_SECS, QUIET_PEAK, SILENCE_THRESHOLD, TARGET_SAMPLE_RATE,
    WINDOW_SECS,
};
pub use replay::ReplayDevice;
pub use waveform::{column_envelope, WaveformData, WaveformSampler, DEFAULT_FRAME_LEN};
