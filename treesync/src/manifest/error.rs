//! Error types for manifest parsing and serialization.

use std::io;

use thiserror::Error;

/// Errors that can occur while reading or writing a hash manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file exceeds the maximum supported size.
    #[error("manifest is too large: {len} bytes (max: {max})")]
    TooLarge { len: u64, max: u64 },

    /// The file ended before the declared entries were satisfied.
    #[error("manifest truncated while reading {context}")]
    Truncated { context: &'static str },

    /// The entry count field is negative.
    #[error("manifest declares invalid entry count {0}")]
    InvalidCount(i32),

    /// A path length field is negative.
    #[error("manifest entry declares invalid path length {0}")]
    InvalidPathLength(i32),

    /// A path is not valid UTF-8.
    #[error("manifest entry path is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A path is absolute, empty, or escapes the root via `..`.
    #[error("manifest entry path is unsafe: {0:?}")]
    UnsafePath(String),

    /// Bytes remain after the last declared entry.
    #[error("manifest has {0} trailing bytes after the last entry")]
    TrailingData(usize),

    /// Too many entries to encode in the count field.
    #[error("too many entries to serialize: {0}")]
    TooManyEntries(usize),

    /// I/O error reading or writing the manifest file.
    #[error(transparent)]
    Io(#[from] io::Error),
}
