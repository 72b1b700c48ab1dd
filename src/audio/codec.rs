//! PCM16 frame codec
//!
//! The live agent speaks raw 16-bit little-endian PCM in both directions.
//! This module converts between the device's f32 sample format and the wire
//! format. Pure functions, no state.

use anyhow::{bail, Result};

/// Bytes per PCM16 sample on the wire.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Encode f32 samples to PCM16-LE bytes.
///
/// Samples are clamped to [-1.0, 1.0] before quantization, so hot input
/// can't wrap around to the opposite sign.
pub fn encode(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        let quantized = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        bytes.extend_from_slice(&quantized.to_le_bytes());
    }
    bytes
}

/// Decode PCM16-LE bytes to f32 samples in [-1.0, 1.0).
///
/// Reads little-endian regardless of host byte order. An odd byte count is
/// malformed input and is rejected; callers drop the frame and continue.
pub fn decode(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % BYTES_PER_SAMPLE != 0 {
        bail!("malformed PCM16 payload: odd length {} bytes", bytes.len());
    }

    Ok(bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}
