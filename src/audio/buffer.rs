//! Sample storage for a recording session.
//!
//! Two buffers live here, one per tap on the live signal:
//!
//! * [`ChunkBuffer`]: the accumulation path.  Every block delivered by the
//!   capture device is cloned and appended; nothing is inspected until the
//!   session stops, when [`ChunkBuffer::merge`] concatenates everything in a
//!   single pass.
//! * [`RingBuffer`]: the visualisation path.  A fixed-capacity circular
//!   buffer holding only the most recent samples, read without draining by
//!   the waveform sampler.
//!
//! # Example
//!
//! ```rust
//! use voice_recorder::audio::ChunkBuffer;
//!
//! let mut chunks = ChunkBuffer::new();
//! chunks.push_block(&[0.1, 0.2]);
//! chunks.push_block(&[0.3]);
//!
//! let merged = chunks.merge(16_000);
//! assert_eq!(merged.samples, vec![0.1, 0.2, 0.3]);
//! assert_eq!(merged.sample_rate, 16_000);
//! ```

// ---------------------------------------------------------------------------
// ChunkBuffer
// ---------------------------------------------------------------------------

/// Append-only list of cloned sample blocks.
///
/// Pushing is O(block size): one copy, no scanning.  The total sample count
/// is tracked incrementally so [`merge`](Self::merge) can allocate once.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<f32>>,
    total: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone `block` and append it.
    ///
    /// Device blocks are reused by the platform after the callback returns,
    /// so the copy must happen here, before storage.
    pub fn push_block(&mut self, block: &[f32]) {
        if block.is_empty() {
            return;
        }
        self.total += block.len();
        self.chunks.push(block.to_vec());
    }

    /// Number of stored chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total number of samples across all chunks.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Concatenate all chunks in arrival order, consuming the buffer.
    pub fn merge(self, sample_rate: u32) -> MergedRecording {
        let mut samples = Vec::with_capacity(self.total);
        for chunk in &self.chunks {
            samples.extend_from_slice(chunk);
        }
        MergedRecording {
            samples,
            sample_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// MergedRecording
// ---------------------------------------------------------------------------

/// The flat, immutable result of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecording {
    /// Mono samples in arrival order.
    pub samples: Vec<f32>,
    /// Rate negotiated with the device.  Never resampled.
    pub sample_rate: u32,
}

impl MergedRecording {
    /// `samples.len() / sample_rate`, or `0.0` for a zero rate.
    pub fn duration_secs(&self) -> f64 {
        duration_secs(self.samples.len(), self.sample_rate)
    }
}

/// Duration of `len` mono samples at `sample_rate` Hz.
pub fn duration_secs(len: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    len as f64 / sample_rate as f64
}

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity circular buffer.
///
/// When full, new samples overwrite the oldest, so the most recent
/// `capacity` samples are always available.  The buffer never allocates
/// beyond its initial capacity.
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the *next* write position (wraps around `capacity`).
    write_pos: usize,
    /// Number of valid samples currently stored (≤ `capacity`).
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append `data`, overwriting the oldest samples on overflow.
    pub fn push_slice(&mut self, data: &[T]) {
        // Only the tail can survive; skip what would be overwritten anyway.
        let data = if data.len() > self.capacity {
            &data[data.len() - self.capacity..]
        } else {
            data
        };
        for &item in data {
            self.buf[self.write_pos] = item;
            self.write_pos = (self.write_pos + 1) % self.capacity;
        }
        self.len = (self.len + data.len()).min(self.capacity);
    }

    /// Copy the most recent `out.len()` samples into `out` in chronological
    /// order, without consuming them.
    ///
    /// Returns the number of samples written, which is smaller than
    /// `out.len()` while the buffer holds fewer samples than requested.
    pub fn copy_latest(&self, out: &mut [T]) -> usize {
        let n = out.len().min(self.len);
        // Oldest of the requested samples sits `n` positions behind write_pos.
        let start = (self.write_pos + self.capacity - n) % self.capacity;
        for (i, slot) in out.iter_mut().take(n).enumerate() {
            *slot = self.buf[(start + i) % self.capacity];
        }
        n
    }

    /// Discard all samples and reset the write position.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- ChunkBuffer -------------------------------------------------------

    #[test]
    fn blocks_merge_in_arrival_order() {
        let a = vec![0.1_f32; 3];
        let b = vec![0.2_f32; 5];
        let c = vec![0.3_f32; 2];

        let mut chunks = ChunkBuffer::new();
        chunks.push_block(&a);
        chunks.push_block(&b);
        chunks.push_block(&c);
        assert_eq!(chunks.chunk_count(), 3);
        assert_eq!(chunks.len(), 10);

        let merged = chunks.merge(16_000);
        assert_eq!(merged.samples.len(), a.len() + b.len() + c.len());
        assert_eq!(&merged.samples[0..3], a.as_slice());
        assert_eq!(&merged.samples[3..8], b.as_slice());
        assert_eq!(&merged.samples[8..10], c.as_slice());
    }

    #[test]
    fn pushed_block_is_a_copy() {
        let mut device_buf = vec![0.5_f32; 4];
        let mut chunks = ChunkBuffer::new();
        chunks.push_block(&device_buf);

        // The platform overwrites its block after the callback returns.
        device_buf.iter_mut().for_each(|s| *s = -1.0);

        let merged = chunks.merge(8_000);
        assert_eq!(merged.samples, vec![0.5; 4]);
    }

    #[test]
    fn empty_blocks_are_ignored() {
        let mut chunks = ChunkBuffer::new();
        chunks.push_block(&[]);
        assert!(chunks.is_empty());
        assert_eq!(chunks.chunk_count(), 0);
        assert!(chunks.merge(16_000).samples.is_empty());
    }

    #[test]
    fn duration_is_len_over_rate() {
        let merged = MergedRecording {
            samples: vec![0.0; 24_000],
            sample_rate: 16_000,
        };
        assert_eq!(merged.duration_secs(), 1.5);
        assert_eq!(duration_secs(12_345, 48_000), 12_345.0 / 48_000.0);
    }

    #[test]
    fn zero_rate_has_zero_duration() {
        assert_eq!(duration_secs(100, 0), 0.0);
    }

    // ---- RingBuffer --------------------------------------------------------

    #[test]
    fn copy_latest_within_capacity() {
        let mut ring = RingBuffer::new(8);
        ring.push_slice(&[1.0_f32, 2.0, 3.0]);

        let mut out = [0.0_f32; 2];
        assert_eq!(ring.copy_latest(&mut out), 2);
        assert_eq!(out, [2.0, 3.0]);
        // Non-draining.
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn copy_latest_after_wraparound() {
        let mut ring = RingBuffer::new(4);
        ring.push_slice(&[1.0_f32, 2.0, 3.0]);
        ring.push_slice(&[4.0, 5.0, 6.0]);

        let mut out = [0.0_f32; 4];
        assert_eq!(ring.copy_latest(&mut out), 4);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn oversized_push_keeps_tail() {
        let mut ring = RingBuffer::new(3);
        ring.push_slice(&[1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(ring.len(), 3);

        let mut out = [0.0_f32; 3];
        ring.copy_latest(&mut out);
        assert_eq!(out, [5.0, 6.0, 7.0]);
    }

    #[test]
    fn copy_latest_reports_short_fill() {
        let mut ring = RingBuffer::new(16);
        ring.push_slice(&[9.0_f32]);

        let mut out = [0.0_f32; 4];
        assert_eq!(ring.copy_latest(&mut out), 1);
        assert_eq!(out[0], 9.0);
    }

    #[test]
    fn clear_resets_state() {
        let mut ring = RingBuffer::new(4);
        ring.push_slice(&[1.0_f32, 2.0, 3.0, 4.0, 5.0]);
        ring.clear();
        assert!(ring.is_empty());

        ring.push_slice(&[9.0_f32]);
        let mut out = [0.0_f32; 1];
        ring.copy_latest(&mut out);
        assert_eq!(out, [9.0]);
        assert_eq!(ring.capacity(), 4);
    }

    #[test]
    #[should_panic(expected = "RingBuffer capacity must be > 0")]
    fn zero_capacity_panics() {
        let _ring: RingBuffer<f32> = RingBuffer::new(0);
    }
}
