//! Error types for remote archive access.

use thiserror::Error;

/// Errors that can occur while resolving or extracting from a remote archive.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A ranged read failed, came back short, had a bad status, or ran out of bounds.
    #[error("range read failed: {0}")]
    RangeRead(String),

    /// End of central directory or central directory bytes are inconsistent.
    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    /// The requested member is not in the central directory.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Compression method other than stored or deflate.
    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    /// Member is encrypted; encrypted archives are not supported.
    #[error("encrypted entry: {0}")]
    Encrypted(String),

    /// Corrupt compressed stream.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Local I/O error (writing extracted members).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::RangeRead(err.to_string())
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;
