/// Errors raised by the correction entry points.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SpellerError {
    /// Input could not be decoded as UTF-8 text
    #[error("Input is not valid UTF-8")]
    InvalidInput(#[from] std::str::Utf8Error),
}
