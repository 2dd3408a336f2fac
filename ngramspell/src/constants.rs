pub const MODEL_MAGIC: &[u8; 8] = b"NGSPELL\0";
pub const FORMAT_VERSION: u32 = 1;
pub const NGRAM_ORDER: u8 = 3;

/// Byte width of the trailing model checksum.
pub const CHECKSUM_SIZE: usize = 8;

pub const DEFAULT_MAX_CANDIDATES: usize = 5;
pub const DEFAULT_MAX_EDIT_DISTANCE: usize = 2;
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.001;
pub const DEFAULT_UNKNOWN_WORD_FLOOR: f64 = -25.0;
pub const DEFAULT_BACKOFF: f64 = 0.4;
