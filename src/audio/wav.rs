//! Canonical 16-bit PCM mono WAV encoding.
//!
//! Layout (all multi-byte fields little-endian):
//!
//! ```text
//! offset  size  field
//!  0      4     "RIFF"
//!  4      4     36 + data bytes
//!  8      4     "WAVE"
//! 12      4     "fmt "
//! 16      4     16 (fmt chunk size)
//! 20      2     1  (PCM)
//! 22      2     1  (mono)
//! 24      4     sample rate
//! 28      4     sample rate * 2 (byte rate)
//! 32      2     2  (block align)
//! 34      2     16 (bits per sample)
//! 36      4     "data"
//! 40      4     samples * 2
//! 44      ..    i16 samples
//! ```

use std::io::{self, Write};
use std::path::Path;

use super::quality::finite_sample;

/// MIME type of the encoded buffer.
pub const WAV_MIME: &str = "audio/wav";

/// Size of the canonical header in bytes.
pub const HEADER_LEN: usize = 44;

const BYTES_PER_SAMPLE: u32 = 2;

/// Convert one float sample to signed 16-bit PCM.
///
/// Clamped to `[-1, 1]` first; negative values scale by 32768, the rest by
/// 32767, truncating toward zero.  NaN encodes as 0.
pub fn sample_to_i16(s: f32) -> i16 {
    let s = finite_sample(s).clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32_768.0) as i16
    } else {
        (s * 32_767.0) as i16
    }
}

/// Encode `samples` as a complete WAV file in memory.
///
/// `sample_rate` is written unchanged; no resampling happens here.
pub fn encode(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + samples.len() * BYTES_PER_SAMPLE as usize);
    out.extend_from_slice(&header(samples.len(), sample_rate));
    for &s in samples {
        out.extend_from_slice(&sample_to_i16(s).to_le_bytes());
    }
    out
}

/// Stream the WAV encoding of `samples` into `w`.
pub fn write_to<W: Write>(w: &mut W, samples: &[f32], sample_rate: u32) -> io::Result<()> {
    w.write_all(&header(samples.len(), sample_rate))?;
    for &s in samples {
        w.write_all(&sample_to_i16(s).to_le_bytes())?;
    }
    Ok(())
}

/// The 44-byte header for `sample_count` mono 16-bit samples.
pub fn header(sample_count: usize, sample_rate: u32) -> [u8; HEADER_LEN] {
    // Sizes past u32::MAX wrap, matching a 32-bit RIFF field.
    let data_len = (sample_count as u32).wrapping_mul(BYTES_PER_SAMPLE);

    let mut h = [0u8; HEADER_LEN];
    h[0..4].copy_from_slice(b"RIFF");
    h[4..8].copy_from_slice(&36u32.wrapping_add(data_len).to_le_bytes());
    h[8..12].copy_from_slice(b"WAVE");

    h[12..16].copy_from_slice(b"fmt ");
    h[16..20].copy_from_slice(&16u32.to_le_bytes());
    h[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    h[22..24].copy_from_slice(&1u16.to_le_bytes()); // mono
    h[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    h[28..32].copy_from_slice(&sample_rate.wrapping_mul(BYTES_PER_SAMPLE).to_le_bytes());
    h[32..34].copy_from_slice(&(BYTES_PER_SAMPLE as u16).to_le_bytes());
    h[34..36].copy_from_slice(&16u16.to_le_bytes());

    h[36..40].copy_from_slice(b"data");
    h[40..44].copy_from_slice(&data_len.to_le_bytes());
    h
}

/// Encode `samples` into a WAV file at `path`, creating parent directories.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut w = io::BufWriter::new(file);
    write_to(&mut w, samples, sample_rate)?;
    w.flush()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
