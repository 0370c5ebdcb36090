//! Sample format conversion between normalized floats and 16-bit PCM
//!
//! The two directions are deliberately asymmetric: negative values scale by
//! 32768 and non-negative values by 32767, matching existing peers bit for bit.

use crate::error::{ModemError, Result};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

/// Clamp to [-1, 1] and scale to a signed 16-bit sample (truncating)
pub fn float_to_pcm(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

pub fn pcm_to_float(raw: i16) -> f32 {
    if raw < 0 {
        f32::from(raw) / 32768.0
    } else {
        f32::from(raw) / 32767.0
    }
}

pub fn floats_to_pcm(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| float_to_pcm(s)).collect()
}

pub fn pcm_to_floats(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| pcm_to_float(s)).collect()
}

/// Pack samples as signed 16-bit little-endian bytes
pub fn pcm_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        // Writing into a Vec cannot fail
        let _ = bytes.write_i16::<LittleEndian>(sample);
    }
    bytes
}

/// Unpack signed 16-bit little-endian bytes
pub fn pcm_from_le_bytes(bytes: &[u8]) -> Result<Vec<i16>> {
    if bytes.len() % 2 != 0 {
        return Err(ModemError::InvalidPcmLength(bytes.len()));
    }
    let mut samples = vec![0i16; bytes.len() / 2];
    LittleEndian::read_i16_into(bytes, &mut samples);
    Ok(samples)
}
