//! Downloader configuration.

use std::time::Duration;

/// Default number of parallel connections. Chosen to allow useful
/// parallelism without taxing the server.
pub const DEFAULT_CONNECTION_COUNT: usize = 16;

/// Default per-fetch read buffer size (32KB).
pub const DEFAULT_BUFFER_LENGTH: usize = 32 * 1024;

/// Default connect and read timeout.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a [`Downloader`](super::Downloader).
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Maximum number of fetches transferring in parallel.
    pub connection_count: usize,

    /// Size of the read buffer used while streaming a body to disk.
    pub buffer_length: usize,

    /// Connect and read timeout applied to every request.
    pub connection_timeout: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            connection_count: DEFAULT_CONNECTION_COUNT,
            buffer_length: DEFAULT_BUFFER_LENGTH,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}

impl DownloaderConfig {
    /// Create a configuration with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of parallel connections (minimum 1).
    pub fn with_connection_count(mut self, count: usize) -> Self {
        self.connection_count = count.max(1);
        self
    }

    /// Set the read buffer size (minimum 1).
    pub fn with_buffer_length(mut self, length: usize) -> Self {
        self.buffer_length = length.max(1);
        self
    }

    /// Set the connect and read timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}
