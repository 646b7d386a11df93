//! Voice prompt recorder core.
//!
//! Captures mono microphone audio, shows a live waveform, checks the finished
//! take for silence, level and duration problems, and encodes it as a 16-bit
//! PCM WAV ready for upload.
//!
//! * [`audio`]: capture devices, buffers, analysis, WAV encoding, waveform.
//! * [`recorder`]: the start/stop controller tying them together.
//! * [`config`]: `settings.toml` and platform paths.

pub mod audio;
pub mod config;
pub mod recorder;
