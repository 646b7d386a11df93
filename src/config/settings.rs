//! Recorder settings, defaults and TOML persistence.
//!
//! Defaults are the platform policy constants from [`crate::audio`]; a
//! `settings.toml` only needs to name the values it overrides.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::{
    AudioQuality, CaptureConstraints, CLIPPING_PEAK, DEFAULT_FRAME_LEN, MAX_DURATION_SECS,
    MAX_SILENCE_RATIO, MIN_DURATION_SECS, QUIET_PEAK, SILENCE_THRESHOLD, TARGET_SAMPLE_RATE,
    WINDOW_SECS,
};

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Microphone acquisition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Requested rate in Hz.  The device may negotiate another; recordings
    /// keep whatever rate was granted.
    pub target_sample_rate: u32,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    /// Input device name: `None` means the system default.
    pub device: Option<String>,
    /// Frames per delivered block: `None` lets the host decide.
    pub block_size: Option<u32>,
    /// Live waveform frame length in samples.
    pub snapshot_len: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: TARGET_SAMPLE_RATE,
            echo_cancellation: true,
            noise_suppression: true,
            device: None,
            block_size: None,
            snapshot_len: DEFAULT_FRAME_LEN,
        }
    }
}

impl CaptureConfig {
    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            sample_rate: self.target_sample_rate,
            channels: 1,
            echo_cancellation: self.echo_cancellation,
            noise_suppression: self.noise_suppression,
            block_size: self.block_size,
        }
    }
}

// ---------------------------------------------------------------------------
// QualityConfig
// ---------------------------------------------------------------------------

/// Thresholds for post-recording analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_duration_secs: f64,
    /// Also the auto-stop limit.
    pub max_duration_secs: f64,
    /// Window RMS below which a window is silent.
    pub silence_threshold: f32,
    pub max_silence_ratio: f32,
    pub quiet_peak: f32,
    pub clipping_peak: f32,
    pub window_secs: f64,
}

impl Default for QualityConfig {
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

impl QualityConfig {
    pub fn policy(&self) -> AudioQuality {
        AudioQuality {
            min_duration_secs: self.min_duration_secs,
            max_duration_secs: self.max_duration_secs,
            silence_threshold: self.silence_threshold,
            max_silence_ratio: self.max_silence_ratio,
            quiet_peak: self.quiet_peak,
            clipping_peak: self.clipping_peak,
            window_secs: self.window_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Where finished recordings are written by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `None` means [`AppPaths::recordings_dir`].
    pub directory: Option<PathBuf>,
}

impl OutputConfig {
    pub fn resolve_dir(&self, paths: &AppPaths) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| paths.recordings_dir.clone())
    }
}

// ---------------------------------------------------------------------------
// RecorderConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use voice_recorder::config::RecorderConfig;
///
/// // Returns Default when the file is missing.
/// let config = RecorderConfig::load().unwrap();
/// assert_eq!(config.capture.target_sample_rate, 16_000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub capture: CaptureConfig,
    pub quality: QualityConfig,
    pub output: OutputConfig,
}

impl RecorderConfig {
    /// Load from the platform `settings.toml`, or defaults on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.  A missing file yields `Default`.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
