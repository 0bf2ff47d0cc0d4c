//! Payload masking (RFC 6455 Section 5.3).
//!
//! Masking is a plain XOR with a 4-byte key, so applying the same key twice
//! restores the original payload.

/// Byte-by-byte XOR masking.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Word-at-a-time XOR masking, equivalent to [`apply_mask`].
#[inline]
pub fn apply_mask_fast(data: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);
    let mut chunks = data.chunks_exact_mut(4);

    for chunk in &mut chunks {
        let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ mask_u32;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }

    // chunks_exact leaves at most three bytes, all aligned to mask[0..]
    for (byte, key) in chunks.into_remainder().iter_mut().zip(mask) {
        *byte ^= key;
    }
}

/// Produces a fresh masking key for every outbound frame.
///
/// Each key is read from the operating system RNG. Only if that fails does the
/// generator fall back to a clock-seeded sequence, logging a warning.
#[derive(Debug, Clone, Default)]
pub struct MaskGenerator {
    fallback: Option<u32>,
}

impl MaskGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self { fallback: None }
    }

    /// Next masking key.
    pub fn next_mask(&mut self) -> [u8; 4] {
        let mut key = [0u8; 4];
        if getrandom::getrandom(&mut key).is_ok() {
            return key;
        }
        self.fallback_mask()
    }

    fn fallback_mask(&mut self) -> [u8; 4] {
        let counter = match self.fallback {
            Some(counter) => counter,
            None => {
                log::warn!("getrandom unavailable, deriving mask keys from the clock");
                clock_seed()
            }
        }
        .wrapping_add(0x9E37_79B9);
        self.fallback = Some(counter);
        mix(counter).to_le_bytes()
    }
}

/// murmur3 finalizer.
fn mix(counter: u32) -> u32 {
    let b = counter.wrapping_mul(0x85EB_CA6B);
    let c = b ^ (b >> 13);
    let d = c.wrapping_mul(0xC2B2_AE35);
    d ^ (d >> 16)
}

fn clock_seed() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u32)
        .unwrap_or(0x1234_5678)
}
