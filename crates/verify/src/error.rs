use std::fmt;

#[derive(Debug, PartialEq)]
pub enum VerifyError {
    /// `chunk` called with a zero chunk size. Caller bug, fail-fast.
    InvalidChunkSize,
    /// Run configuration failed validation.
    ConfigValidation(String),
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChunkSize => write!(f, "chunk size must be at least 1"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for VerifyError {}
