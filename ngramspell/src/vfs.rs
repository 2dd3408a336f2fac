//! File access used when loading models.

use memmap2::{Mmap, MmapOptions};
use std::fmt::Debug;
use std::io::{Read, Result};
use std::path::Path;

/// Source of model files.
pub trait Filesystem {
    /// File handle type.
    type File: File;

    /// Opens `path` for reading.
    fn open<P: AsRef<Path>>(&self, path: P) -> Result<Self::File>;
}

/// A readable, mappable file.
pub trait File: Read + Debug {
    /// Size in bytes.
    fn len(&self) -> Result<u64>;
    /// Whether the file has no bytes.
    fn is_empty(&self) -> Result<bool>;
    /// Maps the whole file read-only.
    ///
    /// # Safety
    ///
    /// The file must not be modified while the map is alive.
    unsafe fn memory_map(&self) -> Result<Mmap>;

    /// Maps the file, or reads it into memory when it is empty (empty files
    /// cannot be mapped on every platform).
    fn contents(&self) -> Result<Contents> {
        if self.is_empty()? {
            return Ok(Contents::Owned(Vec::new()));
        }

        // The mapping stays valid for as long as the file is not truncated
        // underneath us; models are written by rename, never in place.
        let mmap = unsafe { self.memory_map()? };
        Ok(Contents::Mapped(mmap))
    }
}

/// Bytes of a file, mapped or read.
#[derive(Debug)]
pub enum Contents {
    /// Memory-mapped file.
    Mapped(Mmap),
    /// File read into memory.
    Owned(Vec<u8>),
}

impl std::ops::Deref for Contents {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Contents::Mapped(m) => m,
            Contents::Owned(v) => v,
        }
    }
}

impl File for std::fs::File {
    fn len(&self) -> Result<u64> {
        self.metadata().map(|m| m.len())
    }

    fn is_empty(&self) -> Result<bool> {
        self.len().map(|x| x == 0)
    }

    unsafe fn memory_map(&self) -> Result<Mmap> {
        MmapOptions::new().map(self)
    }
}

/// The local filesystem.
pub struct Fs;

impl Filesystem for Fs {
    type File = std::fs::File;

    #[inline(always)]
    fn open<P: AsRef<Path>>(&self, path: P) -> Result<Self::File> {
        std::fs::File::open(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mapped_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();

        let full = dir.path().join("full");
        std::fs::File::create(&full)
            .unwrap()
            .write_all(b"abc")
            .unwrap();
        let file = Fs.open(&full).unwrap();
        assert_eq!(&*file.contents().unwrap(), b"abc");

        let empty = dir.path().join("empty");
        std::fs::File::create(&empty).unwrap();
        let file = Fs.open(&empty).unwrap();
        assert!(file.contents().unwrap().is_empty());

        assert!(Fs.open(dir.path().join("missing")).is_err());
    }
}
