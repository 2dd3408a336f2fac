//! Scalar types shared by the model and the speller.

/// Index of a word in the sorted model vocabulary.
pub type WordId = u32;

/// Integer key of a 1 to 3 word n-gram.
pub type NgramKey = u64;

/// Dense slot assigned to a trained key by the perfect hash.
pub type SlotIndex = usize;

/// Natural logarithm of a probability.
pub type LogProb = f64;

/// Raw occurrence count before packing.
pub type Count = u64;

/// Similarity cost of a candidate; lower is closer.
pub type Weight = f32;

/// How a stored slot is confirmed to belong to the queried key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyVerification {
    /// Trust the membership filter alone; untrained keys pass at the filter's
    /// false-positive rate.
    FilterOnly,
    /// Store a 16-bit fingerprint per slot.
    Fingerprint,
    /// Store the full 64-bit key per slot.
    FullKey,
}

impl KeyVerification {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            KeyVerification::FilterOnly => 0,
            KeyVerification::Fingerprint => 1,
            KeyVerification::FullKey => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<KeyVerification> {
        match value {
            0 => Some(KeyVerification::FilterOnly),
            1 => Some(KeyVerification::Fingerprint),
            2 => Some(KeyVerification::FullKey),
            _ => None,
        }
    }
}

impl Default for KeyVerification {
    fn default() -> Self {
        KeyVerification::FullKey
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_tags() {
        for v in [
            KeyVerification::FilterOnly,
            KeyVerification::Fingerprint,
            KeyVerification::FullKey,
        ] {
            assert_eq!(KeyVerification::from_u8(v.to_u8()), Some(v));
        }
        assert_eq!(KeyVerification::from_u8(3), None);
    }
}
