//! Bloom filter over trained n-gram keys.

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::codec::{self, Reader};
use super::error::{BuildError, ModelError};
use crate::hash::hash_key;
use crate::types::NgramKey;

const PROBE_SEED_A: u64 = 0xb10_0f;
const PROBE_SEED_B: u64 = 0xf11_7e5;
const MAX_HASHES: u32 = 32;

/// Membership filter with double-hashed probes.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    bit_count: u64,
    hash_count: u32,
}

impl BloomFilter {
    /// Sizes a filter for `expected_count` keys at the target false-positive
    /// rate and inserts `keys`.
    pub fn build(
        keys: &[NgramKey],
        false_positive_rate: f64,
        expected_count: usize,
    ) -> Result<BloomFilter, BuildError> {
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(BuildError::InvalidFalsePositiveRate(false_positive_rate));
        }

        let n = std::cmp::max(expected_count, keys.len()).max(1) as f64;
        let ln2 = std::f64::consts::LN_2;
        let wanted_bits = (-n * false_positive_rate.ln() / (ln2 * ln2)).ceil();
        let words = std::cmp::max(1, ((wanted_bits as u64) + 63) / 64);
        let bit_count = words * 64;
        let hash_count = ((bit_count as f64 / n) * ln2).round() as u32;
        let hash_count = hash_count.clamp(1, MAX_HASHES);

        let mut filter = BloomFilter {
            bits: vec![0u64; words as usize],
            bit_count,
            hash_count,
        };

        for &key in keys {
            filter.insert(key);
        }

        log::debug!(
            "bloom filter: {} keys, {} bits, {} hashes",
            keys.len(),
            bit_count,
            hash_count
        );

        Ok(filter)
    }

    #[inline(always)]
    fn probes(&self, key: NgramKey) -> impl Iterator<Item = u64> {
        let h1 = hash_key(key, PROBE_SEED_A);
        let h2 = hash_key(key, PROBE_SEED_B) | 1;
        let bit_count = self.bit_count;

        (0..u64::from(self.hash_count)).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % bit_count)
    }

    fn insert(&mut self, key: NgramKey) {
        let probes = self.probes(key).collect::<Vec<_>>();
        for pos in probes {
            self.bits[(pos / 64) as usize] |= 1u64 << (pos % 64);
        }
    }

    /// `false` means the key was never inserted; `true` means it possibly was.
    #[inline]
    pub fn contains(&self, key: NgramKey) -> bool {
        self.probes(key)
            .all(|pos| self.bits[(pos / 64) as usize] & (1u64 << (pos % 64)) != 0)
    }

    /// Size of the bit array.
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    /// Probes per key.
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Writes the hash count and the bit array.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.hash_count)?;
        writer.write_u64::<LittleEndian>(self.bits.len() as u64)?;
        for word in self.bits.iter() {
            writer.write_u64::<LittleEndian>(*word)?;
        }
        Ok(())
    }

    /// [`BloomFilter::write`] into a buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let _ = self.write(&mut buf);
        buf
    }

    /// Reads a filter written by [`BloomFilter::write`].
    pub fn from_bytes(buf: &[u8]) -> Result<BloomFilter, ModelError> {
        let mut rdr: Reader<'_> = Cursor::new(buf);
        let section = "bloom filter";

        let hash_count = rdr
            .read_u32::<LittleEndian>()
            .map_err(ModelError::truncated(section))?;
        if hash_count == 0 || hash_count > MAX_HASHES {
            return Err(ModelError::corrupt(format!(
                "bloom filter declares {} hash functions",
                hash_count
            )));
        }

        let bits = codec::read_u64_vec(&mut rdr, section)?;
        if bits.is_empty() {
            return Err(ModelError::corrupt("bloom filter has no bits"));
        }
        if codec::remaining(&rdr) != 0 {
            return Err(ModelError::corrupt("trailing bytes after bloom filter"));
        }

        Ok(BloomFilter {
            bit_count: bits.len() as u64 * 64,
            bits,
            hash_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::city_hash64;

    fn key(i: u64) -> NgramKey {
        city_hash64(&i.to_le_bytes())
    }

    #[test]
    fn no_false_negatives() {
        let keys: Vec<_> = (0..5000).map(key).collect();
        let filter = BloomFilter::build(&keys, 0.01, keys.len()).unwrap();

        assert!(keys.iter().all(|k| filter.contains(*k)));
    }

    #[test]
    fn false_positive_rate_is_bounded() {
        let keys: Vec<_> = (0..5000).map(key).collect();
        let filter = BloomFilter::build(&keys, 0.01, keys.len()).unwrap();

        let probes = 20_000u64;
        let hits = (100_000..100_000 + probes)
            .map(key)
            .filter(|k| filter.contains(*k))
            .count();

        let rate = hits as f64 / probes as f64;
        assert!(rate < 0.03, "false-positive rate {}", rate);
    }

    #[test]
    fn sizing_follows_the_formula() {
        let keys: Vec<_> = (0..1000).map(key).collect();
        let filter = BloomFilter::build(&keys, 0.001, 1000).unwrap();

        // -1000 * ln(0.001) / ln(2)^2 is about 14378 bits, k about 10.
        assert!(filter.bit_count() >= 14_378 && filter.bit_count() < 14_378 + 64);
        assert_eq!(filter.hash_count(), 10);
    }

    #[test]
    fn invalid_rate() {
        for rate in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(matches!(
                BloomFilter::build(&[1], rate, 1),
                Err(BuildError::InvalidFalsePositiveRate(_))
            ));
        }
    }

    #[test]
    fn serialization() {
        let keys: Vec<_> = (0..300).map(key).collect();
        let filter = BloomFilter::build(&keys, 0.01, keys.len()).unwrap();
        let restored = BloomFilter::from_bytes(&filter.to_bytes()).unwrap();

        for i in 0..2000 {
            assert_eq!(filter.contains(key(i)), restored.contains(key(i)));
        }
        assert!(BloomFilter::from_bytes(&[0, 0, 0, 0]).is_err());
    }
}
