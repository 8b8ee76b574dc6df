//! Progress states published during an update cycle.

use std::fmt;

/// The stages of a single update run, published to observers as the
/// updater moves through them. These are transient labels; they are not
/// persisted. Exactly one of [`Done`](ProgressState::Done) or
/// [`Fail`](ProgressState::Fail) is published last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    /// Run started.
    Init,
    /// Copying the stored manifest to the staging path.
    CopyingManifest,
    /// Fetching the server's manifest into the staging path.
    DownloadingManifest,
    /// Computing the difference between local state and the new manifest.
    ComparingFiles,
    /// Deleting files the server no longer publishes.
    DeletingFiles,
    /// Downloading missing and changed files.
    DownloadingFiles,
    /// Committing the staging manifest over the stored manifest.
    UpdatingManifest,
    /// Removing the staging manifest.
    CleanUp,
    /// Run failed.
    Fail,
    /// Run completed successfully.
    Done,
}

impl ProgressState {
    /// Get a human-readable name for the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "Initializing",
            Self::CopyingManifest => "Copying manifest",
            Self::DownloadingManifest => "Downloading manifest",
            Self::ComparingFiles => "Comparing files",
            Self::DeletingFiles => "Deleting files",
            Self::DownloadingFiles => "Downloading files",
            Self::UpdatingManifest => "Updating manifest",
            Self::CleanUp => "Cleaning up",
            Self::Fail => "Failed",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
