//! Error types for asset selection and extraction.

use thiserror::Error;

/// Main error type for detection and extraction operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Nothing matched at some selection stage.
    #[error("{0}")]
    NotFound(String),

    /// More than one item matched and the caller asked for a single result.
    #[error("{reason}")]
    Ambiguous {
        /// Why the selection could not be narrowed to one item
        reason: String,
        /// Display names of every remaining candidate
        candidates: Vec<String>,
    },

    /// The archive or compressed stream could not be parsed.
    #[error("Malformed archive: {0}")]
    Malformed(String),

    /// An archive entry would be written outside the destination.
    #[error("Unsafe entry path: {0}")]
    UnsafePath(String),

    /// The requested operating system or architecture has no matcher.
    #[error("Unsupported target system: {0}")]
    UnsupportedSystem(String),

    /// A matcher regex or chooser glob failed to compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// The matcher configuration document could not be decoded.
    #[error("Invalid matcher config: {0}")]
    Config(#[from] serde_json::Error),

    /// A destination filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a caller can recover by picking from a candidate list or
    /// retrying with a stricter filter.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Ambiguous { .. })
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::InvalidPattern(e.to_string())
    }
}

impl From<globset::Error> for Error {
    fn from(e: globset::Error) -> Self {
        Error::InvalidPattern(e.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Malformed(format!("zip: {}", e))
    }
}
