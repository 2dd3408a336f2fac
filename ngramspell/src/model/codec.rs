//! Bounds-checked reads shared by the model sections.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use super::error::ModelError;

pub(crate) type Reader<'a> = Cursor<&'a [u8]>;

#[inline]
pub(crate) fn remaining(rdr: &Reader<'_>) -> u64 {
    (rdr.get_ref().len() as u64).saturating_sub(rdr.position())
}

/// Fails unless `count` elements of `width` bytes are still available, so a
/// corrupt length never drives a huge allocation.
pub(crate) fn ensure_available(
    rdr: &Reader<'_>,
    count: u64,
    width: u64,
    section: &str,
) -> Result<usize, ModelError> {
    match count.checked_mul(width) {
        Some(bytes) if bytes <= remaining(rdr) => Ok(count as usize),
        _ => Err(ModelError::corrupt(format!(
            "{} declares {} entries but only {} bytes remain",
            section,
            count,
            remaining(rdr)
        ))),
    }
}

pub(crate) fn read_u64_vec(rdr: &mut Reader<'_>, section: &str) -> Result<Vec<u64>, ModelError> {
    let count = rdr
        .read_u64::<LittleEndian>()
        .map_err(ModelError::truncated(section))?;
    let count = ensure_available(rdr, count, 8, section)?;

    let mut out = vec![0u64; count];
    rdr.read_u64_into::<LittleEndian>(&mut out)
        .map_err(ModelError::truncated(section))?;
    Ok(out)
}

pub(crate) fn read_u16_vec(rdr: &mut Reader<'_>, section: &str) -> Result<Vec<u16>, ModelError> {
    let count = rdr
        .read_u64::<LittleEndian>()
        .map_err(ModelError::truncated(section))?;
    let count = ensure_available(rdr, count, 2, section)?;

    let mut out = vec![0u16; count];
    rdr.read_u16_into::<LittleEndian>(&mut out)
        .map_err(ModelError::truncated(section))?;
    Ok(out)
}

/// Reads a `u64` length-prefixed section and returns its bytes.
pub(crate) fn read_section<'a>(rdr: &mut Reader<'a>, section: &str) -> Result<&'a [u8], ModelError> {
    let len = rdr
        .read_u64::<LittleEndian>()
        .map_err(ModelError::truncated(section))?;
    let len = ensure_available(rdr, len, 1, section)?;

    let buf: &'a [u8] = *rdr.get_ref();
    let start = rdr.position() as usize;
    rdr.set_position((start + len) as u64);
    Ok(&buf[start..start + len])
}
