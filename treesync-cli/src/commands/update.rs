//! The `update` command: run one synchronization cycle with console
//! event reporting.

use std::path::PathBuf;

use clap::Args;
use treesync::downloader::DEFAULT_CONNECTION_COUNT;
use treesync::updater::{DEFAULT_MANIFEST_NAME, DEFAULT_SKIPLIST_NAME};
use treesync::{DownloaderConfig, UpdateConfig, Updater};

use crate::error::CliError;

/// Arguments for the `update` command.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Root directory to synchronize
    #[arg(long, short = 'r', default_value = ".")]
    root: PathBuf,

    /// URL of the published hash manifest
    #[arg(long)]
    manifest_url: String,

    /// Base URL of the file archive; per-file paths are appended to it
    #[arg(long)]
    archive_url: String,

    /// Name of the stored manifest file, relative to the root
    #[arg(long, default_value = DEFAULT_MANIFEST_NAME)]
    manifest_name: String,

    /// Name of the optional skiplist file, relative to the root
    #[arg(long, default_value = DEFAULT_SKIPLIST_NAME)]
    skiplist: String,

    /// Maximum number of parallel downloads
    #[arg(long, default_value_t = DEFAULT_CONNECTION_COUNT)]
    connections: usize,
}

/// Run an update cycle, printing events to the console.
pub fn run(args: UpdateArgs) -> Result<(), CliError> {
    if !args.root.is_dir() {
        return Err(CliError::InvalidRoot(args.root));
    }

    let config = UpdateConfig::new(args.root, args.manifest_url, args.archive_url)
        .with_manifest_name(args.manifest_name)
        .with_skiplist_name(args.skiplist)
        .with_downloader(DownloaderConfig::default().with_connection_count(args.connections));

    let mut updater = Updater::new(config);
    updater
        .progress
        .subscribe(|state| println!("State: {}", state));
    updater
        .deleted
        .subscribe(|path| println!("Deleted: {}", path.display()));
    updater
        .downloaded
        .subscribe(|path| println!("Downloaded: {}", path.display()));
    updater
        .transferred
        .subscribe(|bytes| println!("Downloaded: {} bytes", bytes));
    updater
        .errors
        .subscribe(|error| eprintln!("Error: {}", error));

    let summary = updater.run()?;
    println!(
        "Synchronized: {} downloaded, {} deleted, {} bytes",
        summary.files_downloaded, summary.files_deleted, summary.bytes_downloaded
    );
    Ok(())
}
