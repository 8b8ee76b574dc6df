//! Update orchestration: the state machine of a single synchronization run.
//!
//! A run fetches the server's manifest into a staging path, compares it
//! against the last applied manifest (lazily digesting live files where the
//! stored manifest is silent), deletes files the server dropped, downloads
//! missing and changed files in parallel, and commits the staging manifest.
//! Observers follow along through the typed event sites on [`Updater`].

mod config;
mod error;
mod progress;

pub use config::{UpdateConfig, DEFAULT_MANIFEST_NAME, DEFAULT_SKIPLIST_NAME};
pub use error::UpdateError;
pub use progress::ProgressState;

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::downloader::{Downloader, FetchHandle};
use crate::events::EventSite;
use crate::manifest::HashCache;
use crate::urls;

/// Timeout for draining the download pool at the end of a run.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a completed update run.
#[derive(Debug, Clone, Default)]
pub struct UpdateSummary {
    /// Number of obsolete files deleted.
    pub files_deleted: usize,
    /// Number of files downloaded.
    pub files_downloaded: usize,
    /// Total body bytes transferred, including the manifest fetch.
    pub bytes_downloaded: u64,
}

/// Executes the update state machine for one root directory.
///
/// Subscribe to the event sites before calling [`Updater::run`]; events are
/// published synchronously from the calling thread.
pub struct Updater {
    config: UpdateConfig,

    /// State transitions. The final event is exactly one of
    /// [`ProgressState::Done`] or [`ProgressState::Fail`].
    pub progress: EventSite<ProgressState>,

    /// Relative path of each deleted file.
    pub deleted: EventSite<PathBuf>,

    /// Relative path of each successfully downloaded file.
    pub downloaded: EventSite<PathBuf>,

    /// Running total of bytes downloaded, published after the manifest
    /// fetch and after each completed file.
    pub transferred: EventSite<u64>,

    /// Every error encountered, including per-file fetch failures that do
    /// not abort the run.
    pub errors: EventSite<UpdateError>,
}

impl Updater {
    /// Create an updater for the given configuration.
    pub fn new(config: UpdateConfig) -> Self {
        Self {
            config,
            progress: EventSite::new(),
            deleted: EventSite::new(),
            downloaded: EventSite::new(),
            transferred: EventSite::new(),
            errors: EventSite::new(),
        }
    }

    /// The configuration this updater runs with.
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Execute one full update cycle.
    ///
    /// The staging manifest is removed and the download pool drained on
    /// every exit path. On success the summary reflects what the run did;
    /// on failure the error has also been published to [`Updater::errors`],
    /// and the stored manifest is left untouched so the next run retries.
    pub fn run(&mut self) -> Result<UpdateSummary, UpdateError> {
        info!(root = %self.config.root.display(), "starting update");
        self.progress.notify(&ProgressState::Init);

        let downloader = Downloader::with_config(self.config.downloader.clone());
        let staging = self.staging_path();

        let result = self.execute(&downloader);

        self.progress.notify(&ProgressState::CleanUp);
        if let Err(e) = fs::remove_file(&staging) {
            if e.kind() != io::ErrorKind::NotFound {
                self.errors.notify(&UpdateError::Delete {
                    path: staging.clone(),
                    source: e,
                });
            }
        }
        downloader.shutdown(SHUTDOWN_TIMEOUT);

        match result {
            Ok(summary) => {
                info!(
                    downloaded = summary.files_downloaded,
                    deleted = summary.files_deleted,
                    bytes = summary.bytes_downloaded,
                    "update complete"
                );
                self.progress.notify(&ProgressState::Done);
                Ok(summary)
            }
            Err(error) => {
                warn!(%error, "update failed");
                self.errors.notify(&error);
                self.progress.notify(&ProgressState::Fail);
                Err(error)
            }
        }
    }

    fn execute(&mut self, downloader: &Downloader) -> Result<UpdateSummary, UpdateError> {
        let root = self.config.root.clone();
        let stored = root.join(&self.config.manifest_name);
        let staging = self.staging_path();
        let skiplist = root.join(&self.config.skiplist_name);

        let mut summary = UpdateSummary::default();

        // Stage the stored manifest so the manifest fetch can skip an
        // unchanged server copy via the mtime freshness check.
        if stored.is_file() {
            self.progress.notify(&ProgressState::CopyingManifest);
            copy_with_mtime(&stored, &staging).map_err(|e| UpdateError::Copy {
                from: stored.clone(),
                to: staging.clone(),
                source: e,
            })?;
        }

        self.progress.notify(&ProgressState::DownloadingManifest);
        if !staging.is_file() {
            prepare_destination(&staging)?;
        }
        downloader
            .enqueue(&self.config.manifest_url, &staging, false)
            .wait()?;
        self.transferred.notify(&downloader.downloaded_bytes());

        self.progress.notify(&ProgressState::ComparingFiles);
        let mut new_cache = HashCache::load(&staging, None)?;
        let mut old_cache = HashCache::load(&stored, Some(&root))?;

        let mut to_download = old_cache
            .difference(&new_cache)
            .map_err(|source| UpdateError::Compare { source })?;
        let mut to_delete = new_cache
            .difference(&old_cache)
            .map_err(|source| UpdateError::Compare { source })?;

        if skiplist.is_file() {
            let skipped = read_skiplist(&skiplist)?;
            debug!(entries = skipped.len(), "applying skiplist");
            to_download.retain(|path| !skipped.contains(path));
            to_delete.retain(|path| !skipped.contains(path));
        }

        debug!(
            to_download = to_download.len(),
            to_delete = to_delete.len(),
            "comparison complete"
        );

        if !to_delete.is_empty() {
            self.progress.notify(&ProgressState::DeletingFiles);
            for path in &to_delete {
                let file = root.join(path);
                match fs::remove_file(&file) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(UpdateError::Delete {
                            path: file,
                            source: e,
                        })
                    }
                }
                summary.files_deleted += 1;
                self.deleted.notify(&PathBuf::from(path));
            }
        }

        let mut failed = 0;
        let mut scheduled = 0;
        if !to_download.is_empty() {
            self.progress.notify(&ProgressState::DownloadingFiles);

            let mut handles: Vec<(String, FetchHandle)> = Vec::with_capacity(to_download.len());
            for path in &to_download {
                let url = urls::archive_url(&self.config.archive_url, path);
                let dest = root.join(path);
                prepare_destination(&dest)?;
                handles.push((path.clone(), downloader.enqueue(url, dest, true)));
            }
            scheduled = handles.len();

            // A failed fetch is published but never aborts its siblings;
            // everything scheduled is allowed to settle.
            for (path, handle) in handles {
                match handle.wait() {
                    Ok(_) => {
                        summary.files_downloaded += 1;
                        self.downloaded.notify(&PathBuf::from(&path));
                        self.transferred.notify(&downloader.downloaded_bytes());
                    }
                    Err(error) => {
                        failed += 1;
                        self.errors.notify(&UpdateError::Download(error));
                    }
                }
            }
        }

        self.transferred.notify(&downloader.downloaded_bytes());
        summary.bytes_downloaded = downloader.downloaded_bytes();

        if failed > 0 {
            return Err(UpdateError::PartialFailure { failed, scheduled });
        }

        // Commit only after a fully successful download phase, so the
        // stored manifest never claims files that are not on disk.
        self.progress.notify(&ProgressState::UpdatingManifest);
        copy_with_mtime(&staging, &stored).map_err(|e| UpdateError::Copy {
            from: staging.clone(),
            to: stored.clone(),
            source: e,
        })?;

        Ok(summary)
    }

    fn staging_path(&self) -> PathBuf {
        self.config
            .root
            .join(format!("{}.tmp", self.config.manifest_name))
    }
}

/// Copy a file and propagate its modification time to the copy.
fn copy_with_mtime(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    let modified = fs::metadata(from)?.modified()?;
    OpenOptions::new()
        .write(true)
        .open(to)?
        .set_modified(modified)?;
    Ok(())
}

/// Create parent directories and an empty (truncated) destination file.
fn prepare_destination(path: &Path) -> Result<(), UpdateError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| UpdateError::Prepare {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    File::create(path).map_err(|e| UpdateError::Prepare {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Read the skiplist: one relative path per line, LF or CRLF, blank lines
/// ignored.
fn read_skiplist(path: &Path) -> Result<HashSet<String>, UpdateError> {
    let contents = fs::read_to_string(path).map_err(|e| UpdateError::Skiplist {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
