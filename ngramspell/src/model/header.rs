//! Fixed-size model file header.

use std::io::Write;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::codec::Reader;
use super::config::ScoringConfig;
use super::error::ModelError;
use crate::constants::{FORMAT_VERSION, MODEL_MAGIC, NGRAM_ORDER};
use crate::types::KeyVerification;

/// Fixed-size leading block of a model file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHeader {
    /// Format revision that wrote the file.
    pub version: u32,
    /// N-gram order, always 3.
    pub order: u8,
    /// Which verification section follows the counts.
    pub verification: KeyVerification,
    /// Back-off parameters.
    pub scoring: ScoringConfig,
    /// Total 1-, 2- and 3-gram occurrences.
    pub totals: [u64; 3],
}

impl ModelHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 8 + 4 + 1 + 1 + 2 + 3 * 8 + 3 * 8;

    /// Header for the current format revision.
    pub fn new(verification: KeyVerification, scoring: ScoringConfig, totals: [u64; 3]) -> Self {
        ModelHeader {
            version: FORMAT_VERSION,
            order: NGRAM_ORDER,
            verification,
            scoring,
            totals,
        }
    }

    /// Checks only the magic and version, so an unsupported file is reported
    /// as such before its checksum is looked at.
    pub fn check_preamble(buf: &[u8]) -> Result<(), ModelError> {
        if buf.len() < MODEL_MAGIC.len() + 4 {
            return Err(ModelError::corrupt("truncated header"));
        }
        if &buf[..MODEL_MAGIC.len()] != MODEL_MAGIC {
            return Err(ModelError::corrupt("bad magic"));
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&buf[MODEL_MAGIC.len()..MODEL_MAGIC.len() + 4]);
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }

        Ok(())
    }

    /// Reads and validates a header at the cursor position.
    pub fn read(rdr: &mut Reader<'_>) -> Result<ModelHeader, ModelError> {
        let start = rdr.position() as usize;
        Self::check_preamble(&rdr.get_ref()[start..])?;
        rdr.set_position((start + MODEL_MAGIC.len() + 4) as u64);

        let section = "header";
        let order = rdr.read_u8().map_err(ModelError::truncated(section))?;
        if order != NGRAM_ORDER {
            return Err(ModelError::corrupt(format!("n-gram order {}", order)));
        }

        let verification = rdr.read_u8().map_err(ModelError::truncated(section))?;
        let verification = KeyVerification::from_u8(verification).ok_or_else(|| {
            ModelError::corrupt(format!("unknown verification mode {}", verification))
        })?;

        let reserved = rdr
            .read_u16::<LittleEndian>()
            .map_err(ModelError::truncated(section))?;
        if reserved != 0 {
            return Err(ModelError::corrupt("reserved header bits set"));
        }

        let mut floats = [0f64; 3];
        rdr.read_f64_into::<LittleEndian>(&mut floats)
            .map_err(ModelError::truncated(section))?;
        if floats.iter().any(|f| !f.is_finite()) {
            return Err(ModelError::corrupt("non-finite scoring parameter"));
        }

        let mut totals = [0u64; 3];
        rdr.read_u64_into::<LittleEndian>(&mut totals)
            .map_err(ModelError::truncated(section))?;

        Ok(ModelHeader {
            version: FORMAT_VERSION,
            order,
            verification,
            scoring: ScoringConfig {
                unknown_word_floor_log_probability: floats[0],
                bigram_backoff: floats[1],
                unigram_backoff: floats[2],
            },
            totals,
        })
    }

    /// Writes the header, magic first.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(MODEL_MAGIC)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u8(self.order)?;
        writer.write_u8(self.verification.to_u8())?;
        writer.write_u16::<LittleEndian>(0)?;
        writer.write_f64::<LittleEndian>(self.scoring.unknown_word_floor_log_probability)?;
        writer.write_f64::<LittleEndian>(self.scoring.bigram_backoff)?;
        writer.write_f64::<LittleEndian>(self.scoring.unigram_backoff)?;
        for total in self.totals.iter() {
            writer.write_u64::<LittleEndian>(*total)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header() -> ModelHeader {
        ModelHeader::new(
            KeyVerification::Fingerprint,
            ScoringConfig::default(),
            [10, 9, 8],
        )
    }

    #[test]
    fn header_size() {
        let mut buf = vec![];
        header().write(&mut buf).unwrap();
        assert_eq!(buf.len(), ModelHeader::SIZE);

        let read = ModelHeader::read(&mut Cursor::new(&buf[..])).unwrap();
        assert_eq!(read, header());
    }

    #[test]
    fn future_version() {
        let mut buf = vec![];
        header().write(&mut buf).unwrap();
        buf[8..12].copy_from_slice(&7u32.to_le_bytes());

        match ModelHeader::read(&mut Cursor::new(&buf[..])) {
            Err(ModelError::UnsupportedVersion { found: 7, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_magic_and_order() {
        let mut buf = vec![];
        header().write(&mut buf).unwrap();

        let mut magic = buf.clone();
        magic[0] = b'X';
        assert!(matches!(
            ModelHeader::read(&mut Cursor::new(&magic[..])),
            Err(ModelError::Corrupt(_))
        ));

        let mut order = buf;
        order[12] = 2;
        assert!(matches!(
            ModelHeader::read(&mut Cursor::new(&order[..])),
            Err(ModelError::Corrupt(_))
        ));
    }
}
