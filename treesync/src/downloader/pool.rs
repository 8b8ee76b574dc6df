//! Fixed-size worker pool driving the fetch queue.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::config::DownloaderConfig;
use super::error::DownloadError;
use super::fetch;
use super::handle::{FetchHandle, FetchState};

/// Timeout used when a downloader is dropped without an explicit shutdown.
const DROP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// A fetch queued for execution.
pub(crate) struct FetchJob {
    pub(crate) url: String,
    pub(crate) dest: PathBuf,
    pub(crate) force: bool,
    pub(crate) state: Arc<FetchState>,
}

/// State shared between the pool's worker threads.
pub(crate) struct Shared {
    pub(crate) client: reqwest::blocking::Client,
    pub(crate) buffer_length: usize,
    pub(crate) timeout: Duration,
    pub(crate) bytes_downloaded: AtomicU64,
    pub(crate) bytes_remaining: AtomicU64,
    live_workers: Mutex<usize>,
    drained: Condvar,
}

/// Parallel HTTP-to-file downloader.
///
/// At most `connection_count` fetches transfer at any instant; the rest
/// queue. [`Downloader::enqueue`] never blocks beyond registering the job.
/// Dropping the downloader shuts the pool down with a bounded wait, so a
/// scope that owns one cannot leak worker threads past 30 seconds.
pub struct Downloader {
    sender: Mutex<Option<Sender<FetchJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shared: Arc<Shared>,
}

impl Downloader {
    /// Create a downloader with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DownloaderConfig::default())
    }

    /// Create a downloader with the given configuration, spawning its
    /// worker threads immediately.
    pub fn with_config(config: DownloaderConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(config.connection_timeout)
            .timeout(config.connection_timeout)
            .build()
            .expect("failed to create HTTP client");

        let shared = Arc::new(Shared {
            client,
            buffer_length: config.buffer_length,
            timeout: config.connection_timeout,
            bytes_downloaded: AtomicU64::new(0),
            bytes_remaining: AtomicU64::new(0),
            live_workers: Mutex::new(config.connection_count),
            drained: Condvar::new(),
        });

        let (sender, receiver) = mpsc::channel::<FetchJob>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..config.connection_count)
            .map(|_| {
                let shared = Arc::clone(&shared);
                let receiver = Arc::clone(&receiver);
                thread::spawn(move || worker_loop(shared, receiver))
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            shared,
        }
    }

    /// Schedule a fetch of `url` into `dest`.
    ///
    /// With `force == false` the fetch completes without transferring when
    /// the destination's modification time already equals the server's
    /// `Last-Modified`. The returned handle settles when the fetch
    /// terminates; after shutdown it settles immediately with
    /// [`DownloadError::ShutDown`].
    pub fn enqueue(
        &self,
        url: impl Into<String>,
        dest: impl Into<PathBuf>,
        force: bool,
    ) -> FetchHandle {
        let state = Arc::new(FetchState::new());
        let job = FetchJob {
            url: url.into(),
            dest: dest.into(),
            force,
            state: Arc::clone(&state),
        };

        let sender = self.sender.lock().unwrap();
        match sender.as_ref() {
            Some(sender) => {
                if sender.send(job).is_err() {
                    state.settle(Err(DownloadError::ShutDown));
                }
            }
            None => state.settle(Err(DownloadError::ShutDown)),
        }

        FetchHandle::new(state)
    }

    /// Total body bytes read so far, across all fetches.
    pub fn downloaded_bytes(&self) -> u64 {
        self.shared.bytes_downloaded.load(Ordering::SeqCst)
    }

    /// Approximate bytes still expected from scheduled fetches.
    pub fn remaining_bytes(&self) -> u64 {
        self.shared.bytes_remaining.load(Ordering::SeqCst)
    }

    /// Stop accepting new work and wait up to `timeout` for queued and
    /// in-flight fetches to drain. Returns whether the pool fully drained.
    /// Safe to call more than once.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        {
            let mut sender = self.sender.lock().unwrap();
            sender.take();
        }

        let deadline = Instant::now() + timeout;
        let mut live = self.shared.live_workers.lock().unwrap();
        while *live > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(live_workers = *live, "downloader shutdown timed out");
                return false;
            }
            let (guard, wait) = self
                .shared
                .drained
                .wait_timeout(live, remaining)
                .unwrap();
            live = guard;
            if wait.timed_out() && *live > 0 {
                warn!(live_workers = *live, "downloader shutdown timed out");
                return false;
            }
        }
        drop(live);

        let mut workers = self.workers.lock().unwrap();
        for worker in workers.drain(..) {
            worker.join().ok();
        }
        debug!("downloader shut down");
        true
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Downloader {
    fn drop(&mut self) {
        self.shutdown(DROP_SHUTDOWN_TIMEOUT);
    }
}

fn worker_loop(shared: Arc<Shared>, receiver: Arc<Mutex<Receiver<FetchJob>>>) {
    loop {
        let job = {
            let receiver = receiver.lock().unwrap();
            receiver.recv()
        };
        match job {
            Ok(job) => fetch::run(&shared, job),
            Err(_) => break,
        }
    }

    let mut live = shared.live_workers.lock().unwrap();
    *live -= 1;
    shared.drained.notify_all();
}
