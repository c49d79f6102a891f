//! Error types for sniffing, encryption detection and configuration

use std::fmt;
use std::io;

/// Result type alias for fallible (`try_`) operations
pub type DocIdResult<T> = Result<T, DocIdError>;

/// Errors surfaced by the `try_` variants of the public operations.
///
/// The total variants (`classify`, `check_encryption`, ...) never return
/// these; they log and fall back to a conservative default instead.
#[derive(Debug)]
pub enum DocIdError {
    /// I/O error (open, read, directory listing)
    Io(io::Error),
    /// ZIP central directory could not be parsed
    Zip(zip::result::ZipError),
    /// Missing, non-regular or otherwise unusable input
    InvalidInput(String),
    /// EncryptionInfo stream is truncated, malformed or unsupported
    EncryptionInfo(String),
    /// Configuration could not be parsed or failed validation
    Config(String),
}

impl fmt::Display for DocIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocIdError::Io(e) => write!(f, "I/O error: {}", e),
            DocIdError::Zip(e) => write!(f, "ZIP error: {}", e),
            DocIdError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            DocIdError::EncryptionInfo(e) => write!(f, "EncryptionInfo error: {}", e),
            DocIdError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for DocIdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocIdError::Io(e) => Some(e),
            DocIdError::Zip(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DocIdError {
    fn from(err: io::Error) -> Self {
        DocIdError::Io(err)
    }
}

impl From<zip::result::ZipError> for DocIdError {
    fn from(err: zip::result::ZipError) -> Self {
        DocIdError::Zip(err)
    }
}

impl From<serde_json::Error> for DocIdError {
    fn from(err: serde_json::Error) -> Self {
        DocIdError::Config(err.to_string())
    }
}

impl From<quick_xml::Error> for DocIdError {
    fn from(err: quick_xml::Error) -> Self {
        DocIdError::EncryptionInfo(format!("XML descriptor: {}", err))
    }
}
