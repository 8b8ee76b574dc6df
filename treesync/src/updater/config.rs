//! Update orchestrator configuration.

use std::path::PathBuf;

use crate::downloader::DownloaderConfig;

/// Default name of the stored manifest file, relative to the root.
pub const DEFAULT_MANIFEST_NAME: &str = "manifest.hash";

/// Default name of the optional skiplist file, relative to the root.
pub const DEFAULT_SKIPLIST_NAME: &str = "skiplist.txt";

/// Configuration for an [`Updater`](super::Updater).
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Root directory being synchronized.
    pub root: PathBuf,

    /// URL of the server's hash manifest.
    pub manifest_url: String,

    /// Base URL against which encoded file paths are appended.
    pub archive_url: String,

    /// Name of the stored manifest file, relative to the root. The staging
    /// copy lives next to it with a `.tmp` suffix.
    pub manifest_name: String,

    /// Name of the optional skiplist file, relative to the root. Paths
    /// listed there (one per line) are excluded from both deletion and
    /// download.
    pub skiplist_name: String,

    /// Downloader settings used for the run.
    pub downloader: DownloaderConfig,
}

impl UpdateConfig {
    /// Create a configuration with default manifest and skiplist names.
    pub fn new(
        root: impl Into<PathBuf>,
        manifest_url: impl Into<String>,
        archive_url: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            manifest_url: manifest_url.into(),
            archive_url: archive_url.into(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            skiplist_name: DEFAULT_SKIPLIST_NAME.to_string(),
            downloader: DownloaderConfig::default(),
        }
    }

    /// Set the stored manifest file name.
    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    /// Set the skiplist file name.
    pub fn with_skiplist_name(mut self, name: impl Into<String>) -> Self {
        self.skiplist_name = name.into();
        self
    }

    /// Set the downloader configuration.
    pub fn with_downloader(mut self, downloader: DownloaderConfig) -> Self {
        self.downloader = downloader;
        self
    }
}
