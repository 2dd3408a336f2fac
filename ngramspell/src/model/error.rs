//! Model construction and loading errors.

/// Errors raised while compacting raw statistics into a model.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    /// No keys were supplied
    #[error("Cannot build from an empty key set")]
    EmptyKeySet,

    /// The same key appeared twice
    #[error("Duplicate key {0:#018x}")]
    DuplicateKey(u64),

    /// The requested filter false-positive rate is outside (0, 1)
    #[error("False-positive rate must be within (0, 1), got {0}")]
    InvalidFalsePositiveRate(f64),

    /// Only trigram models are supported
    #[error("Unsupported n-gram order {0}")]
    UnsupportedOrder(u8),

    /// The vocabulary does not fit the word id range
    #[error("Vocabulary of {0} words exceeds the word id range")]
    TooManyWords(usize),

    /// A vocabulary word is too long to be serialized
    #[error("Word of {0} bytes exceeds the serializable length")]
    WordTooLong(usize),
}

/// Errors raised while building, loading or saving a model.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The training statistics could not be compacted
    #[error("Failed to build model")]
    Build(#[from] BuildError),

    /// The serialized model failed structural validation
    #[error("Corrupt model: {0}")]
    Corrupt(String),

    /// The model was written by a newer format revision
    #[error("Unsupported model format version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// version found in the header
        found: u32,
        /// highest version this build reads
        supported: u32,
    },

    /// I/O failure reading or writing a model file
    #[error("I/O error")]
    Io(#[source] std::io::Error),
}

impl ModelError {
    pub(crate) fn corrupt<S: Into<String>>(msg: S) -> ModelError {
        ModelError::Corrupt(msg.into())
    }

    /// Maps a read failure while parsing an in-memory buffer.
    pub(crate) fn truncated(section: &str) -> impl FnOnce(std::io::Error) -> ModelError + '_ {
        move |_| ModelError::Corrupt(format!("truncated {}", section))
    }
}
