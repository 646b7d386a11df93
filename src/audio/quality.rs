//! Post-recording signal analysis.
//!
//! [`AudioQuality`] runs one statistical pass over a finished mono clip and
//! produces an [`AnalysisReport`]:
//!
//! | Check | Kind | Blocks submission |
//! |-------|------|-------------------|
//! | Duration below minimum | [`IssueKind::TooShort`] | yes |
//! | Duration above maximum | [`IssueKind::TooLong`] | yes |
//! | Too many silent 100 ms windows | [`IssueKind::TooSilent`] | yes |
//! | Peak amplitude very low | [`IssueKind::TooQuiet`] | no |
//! | Peak amplitude near full scale | [`IssueKind::Clipping`] | no |
//!
//! The clip is split into consecutive fixed-width windows; a trailing
//! partial window is dropped.  A window is silent when its RMS falls below
//! the silence threshold.  Peak amplitude is taken over every sample.
//!
//! # Example
//!
//! ```rust
//! use voice_recorder::audio::{analyze, IssueKind};
//!
//! // 0.2 s of digital silence @ 16 kHz
//! let report = analyze(&vec![0.0_f32; 3_200], 16_000);
//! assert!(!report.is_valid);
//! assert_eq!(report.silence_ratio, 1.0);
//! assert!(report.has(IssueKind::TooShort));
//! assert!(report.has(IssueKind::TooSilent));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::buffer::duration_secs;

/// Requested capture rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
/// Shortest acceptable recording, in seconds.
pub const MIN_DURATION_SECS: f64 = 0.5;
/// Longest acceptable recording, in seconds.
pub const MAX_DURATION_SECS: f64 = 30.0;
/// Window RMS below which a window counts as silent.
pub const SILENCE_THRESHOLD: f32 = 0.01;
/// Largest tolerated fraction of silent windows.
pub const MAX_SILENCE_RATIO: f32 = 0.7;
/// Peak amplitude below which the clip is flagged as quiet.
pub const QUIET_PEAK: f32 = 0.05;
/// Peak amplitude above which the clip is flagged as clipping.
pub const CLIPPING_PEAK: f32 = 0.95;
/// Analysis window width, in seconds.
pub const WINDOW_SECS: f64 = 0.1;

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// Category of a quality problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    TooShort,
    TooLong,
    TooSilent,
    TooQuiet,
    Clipping,
}

impl IssueKind {
    /// Hard issues invalidate the recording; soft ones are advisory.
    pub fn is_hard(self) -> bool {
        matches!(
            self,
            IssueKind::TooShort | IssueKind::TooLong | IssueKind::TooSilent
        )
    }

    /// Wire name, e.g. `"too_short"`.
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::TooShort => "too_short",
            IssueKind::TooLong => "too_long",
            IssueKind::TooSilent => "too_silent",
            IssueKind::TooQuiet => "too_quiet",
            IssueKind::Clipping => "clipping",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected problem with a user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub message: String,
}

// ---------------------------------------------------------------------------
// AnalysisReport
// ---------------------------------------------------------------------------

/// Result of [`AudioQuality::analyze`].  A pure function of its input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Clip length in seconds.
    pub duration: f64,
    /// Fraction of full windows classified as silent; `1.0` when the clip
    /// holds no full window.
    pub silence_ratio: f32,
    /// Mean of per-window RMS values; `0.0` when there are no windows.
    pub avg_rms: f32,
    /// Largest absolute sample value.
    pub peak_amplitude: f32,
    /// Detected problems, in display order.
    pub issues: Vec<Issue>,
    /// `true` iff no hard issue is present.
    pub is_valid: bool,
}

impl AnalysisReport {
    /// Returns `true` when an issue of `kind` was detected.
    pub fn has(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    /// Issues that block submission.
    pub fn hard_issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.kind.is_hard())
    }

    /// Advisory issues shown alongside the recording.
    pub fn soft_issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| !i.kind.is_hard())
    }
}

// ---------------------------------------------------------------------------
// AudioQuality
// ---------------------------------------------------------------------------

/// Analysis thresholds.  `Default` carries the platform policy constants.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioQuality {
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
    pub silence_threshold: f32,
    pub max_silence_ratio: f32,
    pub quiet_peak: f32,
    pub clipping_peak: f32,
    pub window_secs: f64,
}

impl Default for AudioQuality {
    fn default() -> Self {
        Self {
            min_duration_secs: MIN_DURATION_SECS,
            max_duration_secs: MAX_DURATION_SECS,
            silence_threshold: SILENCE_THRESHOLD,
            max_silence_ratio: MAX_SILENCE_RATIO,
            quiet_peak: QUIET_PEAK,
            clipping_peak: CLIPPING_PEAK,
            window_secs: WINDOW_SECS,
        }
    }
}

/// Analyze `samples` with the default policy.
pub fn analyze(samples: &[f32], sample_rate: u32) -> AnalysisReport {
    AudioQuality::default().analyze(samples, sample_rate)
}

/// NaN reads as silence; infinities saturate to full scale.
pub(crate) fn finite_sample(s: f32) -> f32 {
    if s.is_nan() {
        0.0
    } else if s.is_infinite() {
        s.signum()
    } else {
        s
    }
}

impl AudioQuality {
    /// Window width in samples at `sample_rate`.
    pub fn window_size(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 * self.window_secs).round() as usize
    }

    /// Analyze a mono clip.  Total over any input, including an empty clip
    /// and non-finite samples.
    pub fn analyze(&self, samples: &[f32], sample_rate: u32) -> AnalysisReport {
        let duration = duration_secs(samples.len(), sample_rate);

        let peak_amplitude = samples
            .iter()
            .map(|&s| finite_sample(s).abs())
            .fold(0.0_f32, f32::max);

        let window = self.window_size(sample_rate);
        let mut windows = 0usize;
        let mut silent = 0usize;
        let mut rms_sum = 0.0_f64;

        if window > 0 {
            // chunks_exact drops the trailing partial window.
            for chunk in samples.chunks_exact(window) {
                let sum_sq: f64 = chunk
                    .iter()
                    .map(|&s| {
                        let s = finite_sample(s) as f64;
                        s * s
                    })
                    .sum();
                let rms = (sum_sq / window as f64).sqrt();
                rms_sum += rms;
                windows += 1;
                if rms < self.silence_threshold as f64 {
                    silent += 1;
                }
            }
        }

        let (silence_ratio, avg_rms) = if windows > 0 {
            (
                (silent as f64 / windows as f64) as f32,
                (rms_sum / windows as f64) as f32,
            )
        } else {
            (1.0, 0.0)
        };

        let issues = self.classify(duration, silence_ratio, peak_amplitude);
        let is_valid = !issues.iter().any(|i| i.kind.is_hard());

        AnalysisReport {
            duration,
            silence_ratio,
            avg_rms,
            peak_amplitude,
            issues,
            is_valid,
        }
    }

    fn classify(&self, duration: f64, silence_ratio: f32, peak: f32) -> Vec<Issue> {
        let mut issues = Vec::new();

        if duration < self.min_duration_secs {
            issues.push(Issue {
                kind: IssueKind::TooShort,
                message: format!(
                    "Recording too short ({duration:.1}s). Minimum is {}s.",
                    self.min_duration_secs
                ),
            });
        }

        if duration > self.max_duration_secs {
            issues.push(Issue {
                kind: IssueKind::TooLong,
                message: format!(
                    "Recording too long ({duration:.1}s). Maximum is {}s.",
                    self.max_duration_secs
                ),
            });
        }

        if silence_ratio > self.max_silence_ratio {
            let pct = (silence_ratio * 100.0).round() as u32;
            issues.push(Issue {
                kind: IssueKind::TooSilent,
                message: format!(
                    "Recording contains too much silence ({pct}%). \
                     Please speak louder or check your microphone."
                ),
            });
        }

        if peak < self.quiet_peak {
            issues.push(Issue {
                kind: IssueKind::TooQuiet,
                message: "Recording is very quiet. Please speak louder or move closer to the \
                          microphone."
                    .into(),
            });
        }

        if peak > self.clipping_peak {
            issues.push(Issue {
                kind: IssueKind::Clipping,
                message: "Audio may be clipping. Please speak softer or move away from the \
                          microphone."
                    .into(),
            });
        }

        issues
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    fn make_audio(n: usize, amplitude: f32) -> Vec<f32> {
        vec![amplitude; n]
    }

    fn kinds(report: &AnalysisReport) -> Vec<IssueKind> {
        report.issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn clean_speech_level_is_valid() {
        let report = analyze(&make_audio(16_000, 0.3), RATE);
        assert!(report.is_valid);
        assert!(report.issues.is_empty(), "{:?}", report.issues);
        assert_eq!(report.silence_ratio, 0.0);
        assert!((report.avg_rms - 0.3).abs() < 1e-6);
        assert!((report.peak_amplitude - 0.3).abs() < 1e-6);
        assert_eq!(report.duration, 1.0);
    }

    #[test]
    fn all_zero_short_clip() {
        let report = analyze(&make_audio(3_200, 0.0), RATE);
        assert_eq!(report.silence_ratio, 1.0);
        assert_eq!(report.peak_amplitude, 0.0);
        assert_eq!(report.avg_rms, 0.0);
        assert_eq!(
            kinds(&report),
            vec![IssueKind::TooShort, IssueKind::TooSilent, IssueKind::TooQuiet]
        );
        assert!(!report.is_valid);
    }

    #[test]
    fn all_zero_long_clip_is_silent_and_too_long() {
        let report = analyze(&make_audio(31 * 16_000, 0.0), RATE);
        assert_eq!(report.silence_ratio, 1.0);
        assert!(report.has(IssueKind::TooLong));
        assert!(report.has(IssueKind::TooSilent));
        assert!(!report.has(IssueKind::TooShort));
        assert!(!report.is_valid);
    }

    #[test]
    fn empty_clip_is_total() {
        let report = analyze(&[], RATE);
        assert_eq!(report.duration, 0.0);
        assert_eq!(report.silence_ratio, 1.0);
        assert_eq!(report.avg_rms, 0.0);
        assert!(report.has(IssueKind::TooShort));
        assert!(report.has(IssueKind::TooSilent));
        assert!(!report.is_valid);
    }

    #[test]
    fn single_transient_does_not_hide_silence() {
        let mut audio = make_audio(3 * 16_000, 0.0);
        audio[20_000] = -0.9;

        let report = analyze(&audio, RATE);
        assert!((report.peak_amplitude - 0.9).abs() < 1e-6);
        assert!(report.silence_ratio > 0.9, "ratio = {}", report.silence_ratio);
        assert!(report.has(IssueKind::TooSilent));
        assert!(!report.has(IssueKind::TooQuiet));
    }

    #[test]
    fn exactly_min_duration_is_not_too_short() {
        let report = analyze(&make_audio(8_000, 0.3), RATE);
        assert_eq!(report.duration, 0.5);
        assert!(!report.has(IssueKind::TooShort));
        assert!(report.is_valid);
    }

    #[test]
    fn just_under_min_duration_is_too_short() {
        let report = analyze(&make_audio(7_999, 0.3), RATE);
        assert!(report.has(IssueKind::TooShort));
    }

    #[test]
    fn exactly_max_duration_is_not_too_long() {
        let report = analyze(&make_audio(30 * 16_000, 0.3), RATE);
        assert_eq!(report.duration, 30.0);
        assert!(!report.has(IssueKind::TooLong));
    }

    #[test]
    fn just_over_max_duration_is_too_long() {
        // 30.001 s
        let report = analyze(&make_audio(480_016, 0.3), RATE);
        assert!(report.has(IssueKind::TooLong));
        assert!(!report.is_valid);
    }

    #[test]
    fn trailing_partial_window_is_dropped() {
        // 2 full windows of signal + 1 599 trailing silent samples.
        let mut audio = make_audio(3_200, 0.3);
        audio.extend(make_audio(1_599, 0.0));

        let report = analyze(&audio, RATE);
        assert_eq!(report.silence_ratio, 0.0);
        assert!((report.avg_rms - 0.3).abs() < 1e-6);
    }

    #[test]
    fn peak_counts_samples_past_last_window() {
        let mut audio = make_audio(1_600, 0.1);
        audio.push(0.8);

        let report = analyze(&audio, RATE);
        assert!((report.peak_amplitude - 0.8).abs() < 1e-6);
    }

    #[test]
    fn quiet_and_clipping_are_soft() {
        let quiet = analyze(&make_audio(16_000, 0.02), RATE);
        assert!(quiet.has(IssueKind::TooQuiet));
        assert!(quiet.is_valid);
        assert_eq!(quiet.soft_issues().count(), 1);
        assert_eq!(quiet.hard_issues().count(), 0);

        let loud = analyze(&make_audio(16_000, 0.99), RATE);
        assert!(loud.has(IssueKind::Clipping));
        assert!(loud.is_valid);
    }

    #[test]
    fn negotiated_rate_sets_window() {
        let quality = AudioQuality::default();
        assert_eq!(quality.window_size(16_000), 1_600);
        assert_eq!(quality.window_size(44_100), 4_410);
        assert_eq!(quality.window_size(48_000), 4_800);

        let report = quality.analyze(&make_audio(48_000, 0.3), 48_000);
        assert_eq!(report.duration, 1.0);
        assert!(report.is_valid);
    }

    #[test]
    fn zero_rate_is_total() {
        let report = analyze(&make_audio(100, 0.3), 0);
        assert_eq!(report.duration, 0.0);
        assert_eq!(report.silence_ratio, 1.0);
        assert!(!report.is_valid);
    }

    #[test]
    fn nan_reads_as_silence() {
        let report = analyze(&make_audio(16_000, f32::NAN), RATE);
        assert_eq!(report.peak_amplitude, 0.0);
        assert_eq!(report.silence_ratio, 1.0);
        assert!(report.avg_rms.is_finite());
    }

    #[test]
    fn infinity_saturates() {
        let mut audio = make_audio(16_000, 0.3);
        audio[10] = f32::NEG_INFINITY;
        let report = analyze(&audio, RATE);
        assert_eq!(report.peak_amplitude, 1.0);
        assert!(report.avg_rms.is_finite());
        assert!(report.has(IssueKind::Clipping));
    }

    #[test]
    fn messages_are_informative() {
        let report = analyze(&make_audio(3_200, 0.0), RATE);
        let msg = &report.issues[0].message;
        assert_eq!(msg, "Recording too short (0.2s). Minimum is 0.5s.");
        assert!(report.issues[1].message.contains("(100%)"));
    }

    #[test]
    fn report_serialises_with_wire_names() {
        let report = analyze(&make_audio(3_200, 0.0), RATE);
        let json = serde_json::to_value(&report).expect("serialise");
        assert_eq!(json["isValid"], false);
        assert_eq!(json["silenceRatio"], 1.0);
        assert_eq!(json["issues"][0]["type"], "too_short");
        assert_eq!(IssueKind::TooSilent.to_string(), "too_silent");
    }
}
