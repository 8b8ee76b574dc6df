//! Error types for the download engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can fail a single fetch.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Connect failure, protocol error, or mid-body read failure.
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Connect or read timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Failed to open or write the destination file.
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    /// The downloader is no longer accepting work.
    #[error("downloader is shut down")]
    ShutDown,
}
