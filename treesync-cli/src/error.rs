//! Error types for the CLI.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The given root is not an existing directory.
    #[error("root {0} is not a directory")]
    InvalidRoot(PathBuf),

    /// The update run failed.
    #[error("update failed: {0}")]
    Update(#[from] treesync::UpdateError),

    /// Manifest generation failed.
    #[error("manifest generation failed: {0}")]
    Generate(#[from] treesync::ManifestError),
}
