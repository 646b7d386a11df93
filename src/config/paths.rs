//! Cross-platform application paths using the `dirs` crate.
//!
//! Config dir (`settings.toml`):
//!   Windows: %APPDATA%\voice-recorder\
//!   macOS:   ~/Library/Application Support/voice-recorder/
//!   Linux:   ~/.config/voice-recorder/
//!
//! Data dir (finished recordings):
//!   Windows: %LOCALAPPDATA%\voice-recorder\recordings\
//!   macOS:   ~/Library/Application Support/voice-recorder/recordings/
//!   Linux:   ~/.local/share/voice-recorder/recordings/

use std::path::PathBuf;

/// Resolved application directories.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    /// Default output directory for WAV files written by the CLI.
    pub recordings_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voice-recorder";

    /// Falls back to the current directory when the platform has no
    /// standard location.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            recordings_dir: data_dir.join("recordings"),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
