//! Deterministic [`CaptureDevice`] that replays canned blocks.
//!
//! Used by tests and demos in place of real hardware.  Blocks are handed out
//! through one reused scratch buffer, like a platform callback buffer, so a
//! consumer that forgets to copy sees its data overwritten.
//!
//! ```rust
//! use voice_recorder::audio::{CaptureConstraints, CaptureDevice, ReplayDevice};
//!
//! let mut dev = ReplayDevice::new(vec![vec![0.1; 4], vec![0.2; 4]]);
//! assert_eq!(dev.open(&CaptureConstraints::default()).unwrap(), 16_000);
//! assert_eq!(dev.read_block(), Some(&[0.1_f32; 4][..]));
//! assert_eq!(dev.read_block(), Some(&[0.2_f32; 4][..]));
//! assert_eq!(dev.read_block(), None);
//! ```

use std::collections::VecDeque;

use super::capture::{CaptureConstraints, CaptureDevice, CaptureError, Snapshot};

#[derive(Debug, Clone)]
enum SnapshotSource {
    Bytes(Vec<u8>),
    Floats(Vec<f32>),
}

/// Fake input device with canned blocks and an optional fixed snapshot.
#[derive(Debug, Clone)]
pub struct ReplayDevice {
    pending: VecDeque<Vec<f32>>,
    scratch: Vec<f32>,
    snapshot: Option<SnapshotSource>,
    /// Rate reported on open; `None` echoes the requested rate.
    negotiated_rate: Option<u32>,
    deny: bool,
    open: bool,
    opens: usize,
    closes: usize,
    last_constraints: Option<CaptureConstraints>,
}

impl ReplayDevice {
    pub fn new(blocks: Vec<Vec<f32>>) -> Self {
        Self {
            pending: blocks.into(),
            scratch: Vec::new(),
            snapshot: None,
            negotiated_rate: None,
            deny: false,
            open: false,
            opens: 0,
            closes: 0,
            last_constraints: None,
        }
    }

    /// Report `rate` on open regardless of what was requested.
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.negotiated_rate = Some(rate);
        self
    }

    /// Refuse every `open` as if permission were denied.
    pub fn denied(mut self) -> Self {
        self.deny = true;
        self
    }

    /// Serve a fixed unsigned 8-bit snapshot.
    pub fn with_byte_snapshot(mut self, bytes: Vec<u8>) -> Self {
        self.snapshot = Some(SnapshotSource::Bytes(bytes));
        self
    }

    /// Serve a fixed float snapshot.
    pub fn with_float_snapshot(mut self, floats: Vec<f32>) -> Self {
        self.snapshot = Some(SnapshotSource::Floats(floats));
        self
    }

    /// Queue another block behind the pending ones.
    pub fn queue_block(&mut self, block: Vec<f32>) {
        self.pending.push_back(block);
    }

    /// Grant or deny future `open` calls.
    pub fn set_denied(&mut self, deny: bool) {
        self.deny = deny;
    }

    pub fn pending_blocks(&self) -> usize {
        self.pending.len()
    }

    /// Successful `open` calls so far.
    pub fn opens(&self) -> usize {
        self.opens
    }

    /// `close` calls that released an open device.
    pub fn closes(&self) -> usize {
        self.closes
    }

    pub fn last_constraints(&self) -> Option<&CaptureConstraints> {
        self.last_constraints.as_ref()
    }
}

impl CaptureDevice for ReplayDevice {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<u32, CaptureError> {
        self.last_constraints = Some(constraints.clone());
        if self.deny {
            return Err(CaptureError::DeviceUnavailable(
                "microphone permission denied".into(),
            ));
        }
        self.open = true;
        self.opens += 1;
        Ok(self.negotiated_rate.unwrap_or(constraints.sample_rate))
    }

    fn read_block(&mut self) -> Option<&[f32]> {
        if !self.open {
            return None;
        }
        let block = self.pending.pop_front()?;
        self.scratch.clear();
        self.scratch.extend_from_slice(&block);
        Some(self.scratch.as_slice())
    }

    fn read_snapshot(&mut self) -> Option<Snapshot<'_>> {
        if !self.open {
            return None;
        }
        match &self.snapshot {
            Some(SnapshotSource::Bytes(b)) => Some(Snapshot::Unsigned8(b)),
            Some(SnapshotSource::Floats(f)) => Some(Snapshot::Float32(f)),
            None => Some(Snapshot::Float32(&[])),
        }
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
