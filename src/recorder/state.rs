//! Recorder lifecycle states.

/// States of one recording session.
///
/// ```text
/// Idle ──start()──▶ Acquiring ──granted──▶ Recording ──stop()──▶ Stopped
///                        └──denied──▶ Idle
/// Recording ──abort()──▶ Idle
/// Stopped ──start()──▶ Acquiring  (new session)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    /// No device held.
    #[default]
    Idle,

    /// Waiting for the platform to grant the microphone.
    Acquiring,

    /// Device open; blocks are being accumulated.
    Recording,

    /// Session finished and its artifact handed out.  The device is released.
    Stopped,
}

impl RecorderState {
    /// Returns `true` while a device is being acquired or held.
    ///
    /// ```
    /// use voice_recorder::recorder::RecorderState;
    ///
    /// assert!(!RecorderState::Idle.is_active());
    /// assert!(RecorderState::Acquiring.is_active());
    /// assert!(RecorderState::Recording.is_active());
    /// assert!(!RecorderState::Stopped.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        matches!(self, RecorderState::Acquiring | RecorderState::Recording)
    }

    /// Short label for status lines and logs.
    pub fn label(&self) -> &'static str {
        match self {
            RecorderState::Idle => "Idle",
            RecorderState::Acquiring => "Acquiring",
            RecorderState::Recording => "Recording",
            RecorderState::Stopped => "Stopped",
        }
    }
}
