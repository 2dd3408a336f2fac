//! Packs occurrence counts into 16 bits.
//!
//! Counts below 2^15 are stored exactly. Larger counts set the high bit and
//! store a logarithmic bucket, keeping the relative error around 0.1% up to
//! `u64::MAX`.

use crate::types::Count;

const EXACT_LIMIT: u64 = 0x8000;
const BUCKETS: f64 = 32767.0;

#[inline(always)]
fn log_step() -> f64 {
    ((u64::MAX as f64).ln() - (EXACT_LIMIT as f64).ln()) / BUCKETS
}

/// Packs a count into 16 bits; exact below 2^15.
pub fn pack_count(count: Count) -> u16 {
    if count < EXACT_LIMIT {
        return count as u16;
    }

    let bucket = (((count as f64).ln() - (EXACT_LIMIT as f64).ln()) / log_step()).round();
    0x8000 | (bucket.clamp(0.0, BUCKETS) as u16)
}

/// Inverse of [`pack_count`], approximate for large counts.
pub fn unpack_count(packed: u16) -> Count {
    if packed < 0x8000 {
        return Count::from(packed);
    }

    let bucket = f64::from(packed & 0x7fff);
    // float to int casts saturate
    ((EXACT_LIMIT as f64).ln() + bucket * log_step()).exp().round() as Count
}
