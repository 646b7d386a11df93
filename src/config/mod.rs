//! Configuration: `RecorderConfig` (capture, quality and output settings),
//! `AppPaths` for cross-platform directories, and TOML persistence via
//! `RecorderConfig::load` / `RecorderConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{CaptureConfig, OutputConfig, QualityConfig, RecorderConfig};
