//! Parallel HTTP-to-file download engine.
//!
//! A [`Downloader`] owns a fixed pool of worker threads, each streaming one
//! HTTP body to disk at a time. Fetches are enqueued without blocking and
//! settle through [`FetchHandle`]s. Two shared counters track progress:
//! `bytes_downloaded` (total body bytes read, strictly non-decreasing) and
//! `bytes_remaining` (approximate: credited with each fetch's announced
//! `Content-Length`, debited as bytes arrive or when the fetch settles).
//!
//! A fetch with `force == false` is skipped entirely when the destination
//! file's modification time equals the server's `Last-Modified`, which is
//! the cheap freshness check the updater relies on for the manifest fetch.

mod config;
mod error;
mod fetch;
mod handle;
mod pool;

pub use config::{
    DownloaderConfig, DEFAULT_BUFFER_LENGTH, DEFAULT_CONNECTION_COUNT, DEFAULT_CONNECTION_TIMEOUT,
};
pub use error::DownloadError;
pub use handle::{FetchHandle, FetchOutcome};
pub use pool::Downloader;
