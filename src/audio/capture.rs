//! Microphone access behind the [`CaptureDevice`] capability.
//!
//! The recorder never talks to the platform directly.  It opens a device
//! with [`CaptureConstraints`], then pulls from two independent taps on the
//! same live signal:
//!
//! * [`CaptureDevice::read_block`]: the next delivered block, in order.
//! * [`CaptureDevice::read_snapshot`]: the most recent time-domain window,
//!   for visualisation only.
//!
//! [`CpalDevice`] is the real implementation.  The cpal callback runs on the
//! host audio thread; it downmixes to mono, forwards each block over an mpsc
//! channel and refreshes a [`RingBuffer`] snapshot tap.  Neither side blocks
//! the audio thread.

use std::sync::{mpsc, Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use thiserror::Error;

use super::buffer::RingBuffer;
use super::quality::TARGET_SAMPLE_RATE;

// ---------------------------------------------------------------------------
// CaptureConstraints
// ---------------------------------------------------------------------------

/// What the recorder asks of the device.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConstraints {
    /// Requested sample rate in Hz.  The device may negotiate another.
    pub sample_rate: u32,
    /// Requested channel count.  Always 1; wider devices are downmixed.
    pub channels: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    /// Frames per block, or `None` for the host default.
    pub block_size: Option<u32>,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            sample_rate: TARGET_SAMPLE_RATE,
            channels: 1,
            echo_cancellation: true,
            noise_suppression: true,
            block_size: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A live time-domain window in the device's native representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Snapshot<'a> {
    /// Unsigned 8-bit, centred on 128.
    Unsigned8(&'a [u8]),
    /// Floats, nominally in `[-1, 1]`.
    Float32(&'a [f32]),
}

impl Snapshot<'_> {
    pub fn len(&self) -> usize {
        match self {
            Snapshot::Unsigned8(b) => b.len(),
            Snapshot::Float32(f) => f.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Reasons a device could not be acquired.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no audio input device available")]
    NoDevice,

    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("unsupported input sample format: {0}")]
    UnsupportedFormat(String),
}

// ---------------------------------------------------------------------------
// CaptureDevice
// ---------------------------------------------------------------------------

/// Capability interface over a mono input device.
pub trait CaptureDevice {
    /// Acquire the device and start delivering blocks.
    ///
    /// Returns the negotiated sample rate, which may differ from
    /// `constraints.sample_rate`.
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<u32, CaptureError>;

    /// Next pending block in delivery order, or `None` if nothing is queued.
    ///
    /// The slice borrows a device-owned buffer that is overwritten by the
    /// next call; callers must copy what they keep.
    fn read_block(&mut self) -> Option<&[f32]>;

    /// Most recent time-domain window, or `None` when closed.
    fn read_snapshot(&mut self) -> Option<Snapshot<'_>>;

    /// Stop the hardware and release every resource.  Safe to call twice.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

// ---------------------------------------------------------------------------
// CpalDevice
// ---------------------------------------------------------------------------

/// Microphone capture built on `cpal`.
pub struct CpalDevice {
    /// Input device name, or `None` for the host default.
    device_name: Option<String>,
    snapshot_len: usize,
    active: Option<ActiveStream>,
}

/// Everything that lives only while the stream is open.
struct ActiveStream {
    stream: cpal::Stream,
    blocks: mpsc::Receiver<Vec<f32>>,
    ring: Arc<Mutex<RingBuffer<f32>>>,
    current: Vec<f32>,
    scratch: Vec<f32>,
    filled: usize,
}

impl CpalDevice {
    /// # Panics
    ///
    /// Panics if `snapshot_len == 0`.
    pub fn new(device_name: Option<String>, snapshot_len: usize) -> Self {
        assert!(snapshot_len > 0, "snapshot length must be > 0");
        Self {
            device_name,
            snapshot_len,
            active: None,
        }
    }

    fn find_device(&self, host: &cpal::Host) -> Result<cpal::Device, CaptureError> {
        match &self.device_name {
            None => host.default_input_device().ok_or(CaptureError::NoDevice),
            Some(wanted) => host
                .input_devices()
                .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
                .find(|d| d.name().map(|n| &n == wanted).unwrap_or(false))
                .ok_or(CaptureError::NoDevice),
        }
    }
}

/// Prefer a config that supports the requested rate natively, fewest
/// channels first; otherwise take the device default.
fn pick_config(
    device: &cpal::Device,
    constraints: &CaptureConstraints,
) -> Result<cpal::SupportedStreamConfig, CaptureError> {
    let wanted = cpal::SampleRate(constraints.sample_rate);

    if let Ok(ranges) = device.supported_input_configs() {
        let mut matching: Vec<_> = ranges
            .filter(|r| r.min_sample_rate() <= wanted && wanted <= r.max_sample_rate())
            .filter(|r| {
                matches!(
                    r.sample_format(),
                    cpal::SampleFormat::F32 | cpal::SampleFormat::I16 | cpal::SampleFormat::U16
                )
            })
            .collect();
        matching.sort_by_key(|r| {
            (
                r.channels(),
                r.sample_format() != cpal::SampleFormat::F32,
            )
        });
        if let Some(range) = matching.into_iter().next() {
            return Ok(range.with_sample_rate(wanted));
        }
    }

    device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tx: mpsc::Sender<Vec<f32>>,
    ring: Arc<Mutex<RingBuffer<f32>>>,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let channels = config.channels.max(1) as usize;

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = data
                    .chunks(channels)
                    .map(|frame| {
                        let sum: f32 = frame.iter().map(|&s| s.to_sample::<f32>()).sum();
                        sum / frame.len() as f32
                    })
                    .collect();

                // Visualisation is best-effort; skip the update on contention.
                if let Ok(mut ring) = ring.try_lock() {
                    ring.push_slice(&mono);
                }
                // Ignore send errors; the receiver may have been dropped.
                let _ = tx.send(mono);
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None,
        )
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))
}

impl CaptureDevice for CpalDevice {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<u32, CaptureError> {
        self.close();

        let host = cpal::default_host();
        let device = self.find_device(&host)?;
        log::info!(
            "Using audio input device: {}",
            device.name().unwrap_or_else(|_| "<unnamed>".into())
        );

        if constraints.echo_cancellation || constraints.noise_suppression {
            log::debug!("echo cancellation / noise suppression are left to the OS input chain");
        }

        let supported = pick_config(&device, constraints)?;
        let sample_format = supported.sample_format();
        let mut config: cpal::StreamConfig = supported.into();
        if let Some(frames) = constraints.block_size {
            config.buffer_size = cpal::BufferSize::Fixed(frames);
        }
        let sample_rate = config.sample_rate.0;

        if sample_rate != constraints.sample_rate {
            log::warn!(
                "Device negotiated {sample_rate} Hz instead of {} Hz; recording unresampled",
                constraints.sample_rate
            );
        }

        let (tx, rx) = mpsc::channel();
        let ring = Arc::new(Mutex::new(RingBuffer::new(self.snapshot_len)));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, tx, ring.clone())?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, tx, ring.clone())?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, tx, ring.clone())?,
            other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
        };

        stream
            .play()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        log::info!(
            "Audio stream open: {sample_rate} Hz, {} channel(s) downmixed to mono, {sample_format:?}",
            config.channels
        );

        self.active = Some(ActiveStream {
            stream,
            blocks: rx,
            ring,
            current: Vec::new(),
            scratch: vec![0.0; self.snapshot_len],
            filled: 0,
        });
        Ok(sample_rate)
    }

    fn read_block(&mut self) -> Option<&[f32]> {
        let active = self.active.as_mut()?;
        active.current = active.blocks.try_recv().ok()?;
        Some(active.current.as_slice())
    }

    fn read_snapshot(&mut self) -> Option<Snapshot<'_>> {
        let active = self.active.as_mut()?;
        // On contention the previous window is returned again.
        if let Ok(ring) = active.ring.try_lock() {
            active.filled = ring.copy_latest(&mut active.scratch);
        }
        Some(Snapshot::Float32(&active.scratch[..active.filled]))
    }

    fn close(&mut self) {
        if let Some(active) = self.active.take() {
            if let Err(e) = active.stream.pause() {
                log::debug!("pausing stream before drop failed: {e}");
            }
            // Dropping the stream releases the hardware.
            drop(active);
            log::info!("Audio stream closed");
        }
    }

    fn is_open(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
