//! Minimal perfect hash over the trained n-gram keys.
//!
//! Keys are placed level by level: every level owns a bit array about twice
//! the size of the keys still unplaced. A key whose bit position is shared with
//! another key moves on to the next level. A key's slot is the rank of its bit
//! among all set bits of all levels, so slots are dense in `[0, n)`. Keys still
//! colliding after the last level are kept in a sorted fallback list.

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::codec::{self, Reader};
use super::error::{BuildError, ModelError};
use crate::hash::hash_key;
use crate::types::{NgramKey, SlotIndex};

const GAMMA: f64 = 2.0;
const MAX_LEVELS: usize = 32;
const LEVEL_SEED: u64 = 0x5eed_0f_1e7e1;

#[derive(Debug, Clone)]
struct Level {
    bits: Vec<u64>,
    /// Set bits in all words before each word.
    ranks: Vec<u64>,
    /// Slots taken by earlier levels.
    rank_offset: u64,
}

impl Level {
    fn new(bits: Vec<u64>, rank_offset: u64) -> Level {
        let mut ranks = Vec::with_capacity(bits.len());
        let mut acc = 0u64;
        for word in bits.iter() {
            ranks.push(acc);
            acc += u64::from(word.count_ones());
        }

        Level {
            bits,
            ranks,
            rank_offset,
        }
    }

    #[inline(always)]
    fn size(&self) -> u64 {
        self.bits.len() as u64 * 64
    }

    #[inline(always)]
    fn position(&self, key: NgramKey, level: usize) -> u64 {
        hash_key(key, LEVEL_SEED.wrapping_add(level as u64)) % self.size()
    }

    #[inline(always)]
    fn is_set(&self, pos: u64) -> bool {
        self.bits[(pos / 64) as usize] & (1u64 << (pos % 64)) != 0
    }

    #[inline(always)]
    fn rank(&self, pos: u64) -> u64 {
        let word = (pos / 64) as usize;
        let mask = (1u64 << (pos % 64)) - 1;
        self.rank_offset + self.ranks[word] + u64::from((self.bits[word] & mask).count_ones())
    }

    fn popcount(&self) -> u64 {
        self.bits.iter().map(|w| u64::from(w.count_ones())).sum()
    }
}

/// Minimal perfect hash from trained keys to `[0, len())`.
#[derive(Debug, Clone)]
pub struct PerfectHash {
    key_count: u64,
    levels: Vec<Level>,
    fallback: Vec<(NgramKey, u64)>,
}

#[inline(always)]
fn level_words(unplaced: usize) -> usize {
    let bits = ((unplaced as f64) * GAMMA).ceil() as usize;
    std::cmp::max(1, (bits + 63) / 64)
}

impl PerfectHash {
    /// Builds a minimal perfect hash over exactly `keys`.
    pub fn build(keys: &[NgramKey]) -> Result<PerfectHash, BuildError> {
        if keys.is_empty() {
            return Err(BuildError::EmptyKeySet);
        }

        let mut unplaced = keys.to_vec();
        unplaced.sort_unstable();
        if let Some(w) = unplaced.windows(2).find(|w| w[0] == w[1]) {
            return Err(BuildError::DuplicateKey(w[0]));
        }

        let mut levels = Vec::new();
        let mut rank_offset = 0u64;

        for level_index in 0..MAX_LEVELS {
            if unplaced.is_empty() {
                break;
            }

            let words = level_words(unplaced.len());
            let mut seen = vec![0u64; words];
            let mut collided = vec![0u64; words];
            let probe = Level::new(vec![0u64; words], 0);

            for &key in unplaced.iter() {
                let pos = probe.position(key, level_index);
                let (w, bit) = ((pos / 64) as usize, 1u64 << (pos % 64));
                if seen[w] & bit != 0 {
                    collided[w] |= bit;
                } else {
                    seen[w] |= bit;
                }
            }

            let bits: Vec<u64> = seen
                .iter()
                .zip(collided.iter())
                .map(|(s, c)| s & !c)
                .collect();
            let level = Level::new(bits, rank_offset);

            unplaced.retain(|&key| !level.is_set(level.position(key, level_index)));
            rank_offset += level.popcount();
            levels.push(level);
        }

        if !unplaced.is_empty() {
            log::warn!(
                "perfect hash: {} keys left after {} levels, using fallback list",
                unplaced.len(),
                MAX_LEVELS
            );
        }

        let fallback = unplaced
            .into_iter()
            .enumerate()
            .map(|(i, key)| (key, rank_offset + i as u64))
            .collect::<Vec<_>>();

        log::debug!(
            "perfect hash: {} keys over {} levels, {} bits",
            keys.len(),
            levels.len(),
            levels.iter().map(|l| l.size()).sum::<u64>()
        );

        Ok(PerfectHash {
            key_count: keys.len() as u64,
            levels,
            fallback,
        })
    }

    /// Number of keys the hash was built over.
    pub fn len(&self) -> usize {
        self.key_count as usize
    }

    /// Always false for a built hash.
    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Maps `key` to a slot in `[0, len())`.
    ///
    /// Trained keys get their own slot. Any other key still gets some slot,
    /// which the caller has to confirm.
    #[inline]
    pub fn lookup(&self, key: NgramKey) -> SlotIndex {
        for (i, level) in self.levels.iter().enumerate() {
            let pos = level.position(key, i);
            if level.is_set(pos) {
                return level.rank(pos) as SlotIndex;
            }
        }

        if let Ok(i) = self.fallback.binary_search_by_key(&key, |&(k, _)| k) {
            return self.fallback[i].1 as SlotIndex;
        }

        (hash_key(key, LEVEL_SEED) % self.key_count) as SlotIndex
    }

    /// Writes the levels and the fallback list.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u64::<LittleEndian>(self.key_count)?;
        writer.write_u32::<LittleEndian>(self.levels.len() as u32)?;

        for level in self.levels.iter() {
            writer.write_u64::<LittleEndian>(level.bits.len() as u64)?;
            for word in level.bits.iter() {
                writer.write_u64::<LittleEndian>(*word)?;
            }
        }

        writer.write_u64::<LittleEndian>(self.fallback.len() as u64)?;
        for (key, slot) in self.fallback.iter() {
            writer.write_u64::<LittleEndian>(*key)?;
            writer.write_u64::<LittleEndian>(*slot)?;
        }

        Ok(())
    }

    /// [`PerfectHash::write`] into a buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write(&mut buf);
        buf
    }

    /// Reads a hash written by [`PerfectHash::write`], checking that its slots
    /// are dense.
    pub fn from_bytes(buf: &[u8]) -> Result<PerfectHash, ModelError> {
        let mut rdr: Reader<'_> = Cursor::new(buf);
        let section = "perfect hash";

        let key_count = rdr
            .read_u64::<LittleEndian>()
            .map_err(ModelError::truncated(section))?;
        if key_count == 0 {
            return Err(ModelError::corrupt("perfect hash has no keys"));
        }

        let level_count = rdr
            .read_u32::<LittleEndian>()
            .map_err(ModelError::truncated(section))? as usize;
        if level_count > MAX_LEVELS {
            return Err(ModelError::corrupt(format!(
                "perfect hash declares {} levels",
                level_count
            )));
        }

        let mut levels = Vec::with_capacity(level_count);
        let mut rank_offset = 0u64;
        for _ in 0..level_count {
            let bits = codec::read_u64_vec(&mut rdr, section)?;
            if bits.is_empty() {
                return Err(ModelError::corrupt("perfect hash level is empty"));
            }
            let level = Level::new(bits, rank_offset);
            rank_offset += level.popcount();
            levels.push(level);
        }

        let fallback_count = rdr
            .read_u64::<LittleEndian>()
            .map_err(ModelError::truncated(section))?;
        let fallback_count = codec::ensure_available(&rdr, fallback_count, 16, section)?;
        let mut fallback = Vec::with_capacity(fallback_count);
        for i in 0..fallback_count {
            let key = rdr
                .read_u64::<LittleEndian>()
                .map_err(ModelError::truncated(section))?;
            let slot = rdr
                .read_u64::<LittleEndian>()
                .map_err(ModelError::truncated(section))?;
            if slot != rank_offset + i as u64 {
                return Err(ModelError::corrupt("perfect hash fallback slot out of order"));
            }
            fallback.push((key, slot));
        }

        if fallback.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(ModelError::corrupt("perfect hash fallback keys unsorted"));
        }

        if rank_offset + fallback.len() as u64 != key_count {
            return Err(ModelError::corrupt(format!(
                "perfect hash places {} keys but declares {}",
                rank_offset + fallback.len() as u64,
                key_count
            )));
        }

        if codec::remaining(&rdr) != 0 {
            return Err(ModelError::corrupt("trailing bytes after perfect hash"));
        }

        Ok(PerfectHash {
            key_count,
            levels,
            fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::city_hash64;

    fn keys(n: u64) -> Vec<NgramKey> {
        (0..n).map(|i| city_hash64(&i.to_le_bytes())).collect()
    }

    fn assert_minimal(hash: &PerfectHash, keys: &[NgramKey]) {
        let mut used = vec![false; keys.len()];
        for &key in keys {
            let slot = hash.lookup(key);
            assert!(slot < keys.len(), "slot {} out of range", slot);
            assert!(!used[slot], "slot {} assigned twice", slot);
            used[slot] = true;
        }
        assert!(used.iter().all(|x| *x));
    }

    #[test]
    fn distinct_slots() {
        for n in [1u64, 2, 3, 10, 64, 65, 1000, 20_000] {
            let keys = keys(n);
            let hash = PerfectHash::build(&keys).unwrap();
            assert_eq!(hash.len(), keys.len());
            assert_minimal(&hash, &keys);
        }
    }

    #[test]
    fn unknown_keys_stay_in_range() {
        let trained = keys(500);
        let hash = PerfectHash::build(&trained).unwrap();

        for i in 10_000u64..12_000 {
            let key = city_hash64(&i.to_le_bytes());
            assert!(hash.lookup(key) < trained.len());
        }
    }

    #[test]
    fn empty_and_duplicates_fail() {
        assert!(matches!(
            PerfectHash::build(&[]),
            Err(BuildError::EmptyKeySet)
        ));
        assert!(matches!(
            PerfectHash::build(&[3, 1, 3]),
            Err(BuildError::DuplicateKey(3))
        ));
    }

    #[test]
    fn serialization_keeps_slots() {
        let keys = keys(5000);
        let hash = PerfectHash::build(&keys).unwrap();
        let restored = PerfectHash::from_bytes(&hash.to_bytes()).unwrap();

        for &key in keys.iter() {
            assert_eq!(hash.lookup(key), restored.lookup(key));
        }
    }

    #[test]
    fn fallback_survives_serialization() {
        let hash = PerfectHash {
            key_count: 2,
            levels: vec![],
            fallback: vec![(1, 0), (2, 1)],
        };

        let restored = PerfectHash::from_bytes(&hash.to_bytes()).unwrap();
        assert_eq!(restored.lookup(1), 0);
        assert_eq!(restored.lookup(2), 1);
        assert!(restored.lookup(3) < 2);
    }

    #[test]
    fn corrupt_bytes_are_rejected() {
        let hash = PerfectHash::build(&keys(300)).unwrap();
        let bytes = hash.to_bytes();

        assert!(PerfectHash::from_bytes(&bytes[..bytes.len() - 3]).is_err());

        let mut wrong_count = bytes.clone();
        wrong_count[0] ^= 0x01;
        assert!(PerfectHash::from_bytes(&wrong_count).is_err());

        let mut trailing = bytes;
        trailing.push(0);
        assert!(PerfectHash::from_bytes(&trailing).is_err());
    }
}
