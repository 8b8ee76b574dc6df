//! Error types for the update orchestrator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::downloader::DownloadError;
use crate::manifest::ManifestError;

/// Errors that can fail an update run.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The stored or staging manifest could not be read or parsed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A fetch failed. Per-file fetch failures are published as events;
    /// this variant surfaces manifest-fetch failures and wraps per-file
    /// failures for event observers.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Digesting local files during comparison failed.
    #[error("failed to digest local files: {source}")]
    Compare { source: io::Error },

    /// Copying a manifest between its stored and staging paths failed.
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// Deleting an obsolete file or the staging manifest failed.
    #[error("failed to delete {path}: {source}")]
    Delete { path: PathBuf, source: io::Error },

    /// Creating a destination file or its parent directories failed.
    #[error("failed to prepare {path}: {source}")]
    Prepare { path: PathBuf, source: io::Error },

    /// The skiplist file exists but could not be read.
    #[error("failed to read skiplist {path}: {source}")]
    Skiplist { path: PathBuf, source: io::Error },

    /// Some per-file fetches failed while others succeeded.
    #[error("{failed} of {scheduled} downloads failed")]
    PartialFailure { failed: usize, scheduled: usize },
}
