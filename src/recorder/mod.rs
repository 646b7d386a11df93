//! Recorder controller: device lifecycle plus the finished-recording
//! artifact.
//!
//! ```rust
//! use voice_recorder::audio::ReplayDevice;
//! use voice_recorder::recorder::{Recorder, RecorderState};
//!
//! let mut rec = Recorder::new(ReplayDevice::new(vec![vec![0.3; 8_000]]));
//! rec.start().unwrap();
//! rec.poll_blocks();
//!
//! let take = rec.stop().unwrap();
//! assert_eq!(rec.state(), RecorderState::Stopped);
//! assert_eq!(take.duration, 0.5);
//! assert!(take.analysis.is_valid);
//! ```

pub mod controller;
pub mod state;

pub use controller::{Recorder, RecorderError, Recording};
pub use state::RecorderState;
