//! Recorder controller: one start/stop API over a [`CaptureDevice`].
//!
//! # Flow
//!
//! ```text
//! start()            open device → Recording
//! poll_blocks()      device blocks ─clone─▶ ChunkBuffer        (every tick)
//! sample_waveform()  device snapshot ─▶ WaveformSampler ─▶ cb  (every frame)
//! stop()             drain → close device → merge → analyze → encode
//! ```
//!
//! Everything runs on the caller's loop; nothing here spawns threads or
//! blocks.  Enforcing the maximum duration is the caller's job: poll
//! [`Recorder::max_duration_reached`] and call [`Recorder::stop_at_limit`],
//! which trims the block that crossed the limit.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::{
    wav, AnalysisReport, AudioQuality, CaptureConstraints, CaptureDevice, CaptureError,
    ChunkBuffer, WaveformSampler, DEFAULT_FRAME_LEN, MAX_DURATION_SECS,
};
use crate::config::RecorderConfig;

use super::state::RecorderState;

// ---------------------------------------------------------------------------
// RecorderError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RecorderError {
    /// Permission denied or no microphone.  Safe to retry.
    #[error(
        "Microphone access denied or unavailable ({0}). \
         Please allow microphone access and try again."
    )]
    DeviceUnavailable(#[from] CaptureError),

    /// The session ended without a single sample.
    #[error("no audio was captured; check that the microphone is connected and unmuted")]
    EmptyRecording,
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// Artifact of one finished session, owned by the caller.
#[derive(Debug, Clone)]
pub struct Recording {
    /// Complete WAV file (see [`wav::WAV_MIME`]).
    pub blob: Vec<u8>,
    /// `samples.len() / sample_rate`, in seconds.
    pub duration: f64,
    /// Negotiated device rate, stamped into the WAV header unchanged.
    pub sample_rate: u32,
    pub samples: Vec<f32>,
    pub analysis: AnalysisReport,
}

impl Recording {
    pub fn mime(&self) -> &'static str {
        wav::WAV_MIME
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Reject a recording that captured nothing.
    pub fn require_samples(self) -> Result<Self, RecorderError> {
        if self.is_empty() {
            Err(RecorderError::EmptyRecording)
        } else {
            Ok(self)
        }
    }
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Per-session data, alive only while recording.
struct Session {
    sample_rate: u32,
    chunks: ChunkBuffer,
    started_at: Instant,
}

/// Owns a capture device exclusively and drives one session at a time.
pub struct Recorder<D: CaptureDevice> {
    device: D,
    constraints: CaptureConstraints,
    quality: AudioQuality,
    max_duration: Duration,
    state: RecorderState,
    session: Option<Session>,
    sampler: WaveformSampler,
}

impl<D: CaptureDevice> Recorder<D> {
    /// Recorder with the built-in capture and quality policy.
    pub fn new(device: D) -> Self {
        Self {
            device,
            constraints: CaptureConstraints::default(),
            quality: AudioQuality::default(),
            max_duration: Duration::from_secs_f64(MAX_DURATION_SECS),
            state: RecorderState::Idle,
            session: None,
            sampler: WaveformSampler::new(DEFAULT_FRAME_LEN),
        }
    }

    /// Recorder configured from `settings.toml` values.
    pub fn with_config(device: D, config: &RecorderConfig) -> Self {
        let quality = config.quality.policy();
        let max_duration = duration_limit(quality.max_duration_secs);
        Self {
            device,
            constraints: config.capture.constraints(),
            quality,
            max_duration,
            state: RecorderState::Idle,
            session: None,
            sampler: WaveformSampler::new(config.capture.snapshot_len.max(1)),
        }
    }

    /// Install the live waveform callback.  Frames arrive only while
    /// recording, once per [`sample_waveform`](Self::sample_waveform) call.
    pub fn set_waveform_callback(&mut self, on_frame: impl FnMut(&[f32]) + 'static) {
        self.sampler.set_callback(on_frame);
    }

    /// Acquire the device and begin a new session.
    ///
    /// A second call while already recording is ignored.  On failure the
    /// recorder returns to [`RecorderState::Idle`] and may be retried.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if self.state == RecorderState::Recording {
            log::warn!("start() ignored: already recording");
            return Ok(());
        }

        self.state = RecorderState::Acquiring;
        let sample_rate = match self.device.open(&self.constraints) {
            Ok(rate) => rate,
            Err(e) => {
                log::warn!("Microphone unavailable: {e}");
                self.state = RecorderState::Idle;
                return Err(e.into());
            }
        };

        if sample_rate != self.constraints.sample_rate {
            log::info!(
                "Recording at negotiated {sample_rate} Hz (requested {} Hz)",
                self.constraints.sample_rate
            );
        }

        self.session = Some(Session {
            sample_rate,
            chunks: ChunkBuffer::new(),
            started_at: Instant::now(),
        });
        self.state = RecorderState::Recording;
        log::info!("Recording started @ {sample_rate} Hz");
        Ok(())
    }

    /// Move every block the device has delivered into the session buffer.
    ///
    /// Returns the number of blocks taken.  Does nothing unless recording.
    pub fn poll_blocks(&mut self) -> usize {
        if self.state != RecorderState::Recording {
            return 0;
        }
        let Some(session) = self.session.as_mut() else {
            return 0;
        };

        let mut taken = 0;
        while let Some(block) = self.device.read_block() {
            session.chunks.push_block(block);
            taken += 1;
        }
        if taken > 0 {
            log::trace!("accumulated {taken} block(s), {} samples", session.chunks.len());
        }
        taken
    }

    /// Produce one live waveform frame.  Call once per rendering frame.
    ///
    /// Returns `false` without touching the device when not recording or
    /// when no callback is installed.
    pub fn sample_waveform(&mut self) -> bool {
        if self.state != RecorderState::Recording || !self.sampler.has_callback() {
            return false;
        }
        match self.device.read_snapshot() {
            Some(snapshot) => {
                self.sampler.sample(snapshot);
                true
            }
            None => false,
        }
    }

    /// Finish the session: release the device, then merge, analyze and
    /// encode.
    ///
    /// Returns `None` (a no-op) unless recording, so a repeated call never
    /// re-merges.
    pub fn stop(&mut self) -> Option<Recording> {
        self.finish(None)
    }

    /// Like [`stop`](Self::stop), but keeps at most
    /// [`max_duration`](Self::max_duration) worth of samples.
    ///
    /// Blocks rarely line up with the limit, so the take that tripped
    /// [`max_duration_reached`](Self::max_duration_reached) usually runs a
    /// few milliseconds over it.  The excess is cut before analysis.
    pub fn stop_at_limit(&mut self) -> Option<Recording> {
        let limit = self.max_duration.as_secs_f64();
        self.finish(Some(limit))
    }

    fn finish(&mut self, limit_secs: Option<f64>) -> Option<Recording> {
        if self.state != RecorderState::Recording {
            log::debug!("stop() ignored in state {}", self.state.label());
            return None;
        }

        self.poll_blocks();
        self.device.close();
        self.state = RecorderState::Stopped;

        let Some(session) = self.session.take() else {
            log::error!("Recorder was recording without a session; nothing to stop");
            return None;
        };

        let mut merged = session.chunks.merge(session.sample_rate);
        if let Some(secs) = limit_secs {
            let max_samples = (secs * merged.sample_rate as f64).floor() as usize;
            if merged.samples.len() > max_samples {
                log::debug!(
                    "Trimming {} sample(s) past the {secs}s limit",
                    merged.samples.len() - max_samples
                );
                merged.samples.truncate(max_samples);
            }
        }
        if merged.samples.is_empty() {
            log::warn!("Recording stopped with no samples captured");
        }

        let duration = merged.duration_secs();
        let analysis = self.quality.analyze(&merged.samples, merged.sample_rate);
        let blob = wav::encode(&merged.samples, merged.sample_rate);

        log::info!(
            "Recording stopped: {duration:.2}s @ {} Hz, {} issue(s), valid = {}",
            merged.sample_rate,
            analysis.issues.len(),
            analysis.is_valid
        );

        Some(Recording {
            blob,
            duration,
            sample_rate: merged.sample_rate,
            samples: merged.samples,
            analysis,
        })
    }

    /// Release the device and drop the session without producing an artifact.
    ///
    /// Returns `true` when a session was discarded.
    pub fn abort(&mut self) -> bool {
        if self.state != RecorderState::Recording {
            return false;
        }
        self.device.close();
        self.session = None;
        self.state = RecorderState::Idle;
        log::info!("Recording aborted");
        true
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Negotiated rate of the current session.
    pub fn sample_rate(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.sample_rate)
    }

    /// Wall-clock time since the session started.
    pub fn elapsed(&self) -> Option<Duration> {
        self.session.as_ref().map(|s| s.started_at.elapsed())
    }

    /// Seconds of audio accumulated so far.
    pub fn captured_secs(&self) -> f64 {
        self.session
            .as_ref()
            .map(|s| crate::audio::buffer::duration_secs(s.chunks.len(), s.sample_rate))
            .unwrap_or(0.0)
    }

    /// `true` once either wall-clock time or captured audio reaches the
    /// configured maximum.
    pub fn max_duration_reached(&self) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        session.started_at.elapsed() >= self.max_duration
            || self.captured_secs() >= self.max_duration.as_secs_f64()
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    pub fn constraints(&self) -> &CaptureConstraints {
        &self.constraints
    }

    pub fn quality(&self) -> &AudioQuality {
        &self.quality
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

/// Convert a configured maximum into a [`Duration`].
///
/// Negative and NaN values become zero.  Values a `Duration` cannot hold,
/// infinity included, fall back to [`MAX_DURATION_SECS`].
fn duration_limit(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_else(|e| {
        log::warn!("Invalid maximum duration {secs}s ({e}); using {MAX_DURATION_SECS}s");
        Duration::from_secs_f64(MAX_DURATION_SECS)
    })
}

impl<D: CaptureDevice> Drop for Recorder<D> {
    fn drop(&mut self) {
        if self.device.is_open() {
            self.device.close();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
