//! treesync - incremental synchronization of a directory tree against a
//! remote authoritative tree published over HTTP.
//!
//! The server publishes a compact binary manifest mapping every relative
//! file path to its SHA-256 digest. A client fetches the new manifest,
//! compares it against the last applied one (or against live on-disk
//! content when no prior manifest exists), deletes files that are no
//! longer published, downloads missing and changed files in parallel, and
//! atomically replaces its stored manifest.
//!
//! # Example
//!
//! ```ignore
//! use treesync::{UpdateConfig, Updater};
//!
//! let config = UpdateConfig::new(
//!     "/opt/game",
//!     "https://downloads.example.com/nightly/nightly.hash",
//!     "https://downloads.example.com/raw/game/",
//! );
//! let mut updater = Updater::new(config);
//! updater.progress.subscribe(|state| println!("State: {}", state));
//! let summary = updater.run()?;
//! println!("{} files downloaded", summary.files_downloaded);
//! ```

pub mod digest;
pub mod downloader;
pub mod events;
pub mod generator;
pub mod manifest;
pub mod updater;
pub mod urls;

pub use digest::{digest_file, Digest};
pub use downloader::{DownloadError, Downloader, DownloaderConfig, FetchHandle, FetchOutcome};
pub use events::{EventSite, SubscriptionId};
pub use generator::{generate_manifest, GenerateSummary};
pub use manifest::{HashCache, ManifestError};
pub use updater::{ProgressState, UpdateConfig, UpdateError, UpdateSummary, Updater};
