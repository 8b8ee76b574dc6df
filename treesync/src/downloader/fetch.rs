//! Single-fetch execution: header inspection, freshness check, and
//! streamed transfer to disk.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::{Duration, UNIX_EPOCH};

use reqwest::blocking::Response;
use reqwest::header::{HeaderMap, CACHE_CONTROL, LAST_MODIFIED};
use tracing::debug;

use super::error::DownloadError;
use super::handle::FetchOutcome;
use super::pool::{FetchJob, Shared};

/// Execute one fetch job and settle its handle.
pub(crate) fn run(shared: &Shared, job: FetchJob) {
    let result = execute(shared, &job);
    if let Err(error) = &result {
        debug!(url = %job.url, %error, "fetch failed");
    }
    job.state.settle(result);
}

fn execute(shared: &Shared, job: &FetchJob) -> Result<FetchOutcome, DownloadError> {
    debug!(url = %job.url, dest = %job.dest.display(), force = job.force, "fetch start");

    let response = shared
        .client
        .get(&job.url)
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .map_err(|e| classify_request_error(e, &job.url, shared.timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: job.url.clone(),
            status: status.as_u16(),
        });
    }

    let last_modified = header_last_modified_millis(response.headers());

    // Credit the announced size to the remaining counter; whatever is not
    // consumed by the transfer is returned below so the counter stays
    // honest on skip and failure paths.
    let mut credit = response.content_length().unwrap_or(0);
    if credit > 0 {
        shared.bytes_remaining.fetch_add(credit, Ordering::SeqCst);
    }

    let result = transfer(shared, job, response, last_modified, &mut credit);

    if credit > 0 {
        shared.bytes_remaining.fetch_sub(credit, Ordering::SeqCst);
    }

    result
}

fn transfer(
    shared: &Shared,
    job: &FetchJob,
    mut response: Response,
    last_modified: i64,
    credit: &mut u64,
) -> Result<FetchOutcome, DownloadError> {
    if !job.force && last_modified != 0 && file_mtime_millis(&job.dest) == Some(last_modified) {
        debug!(dest = %job.dest.display(), "destination up to date, skipping transfer");
        return Ok(FetchOutcome {
            bytes_transferred: 0,
            skipped: true,
        });
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&job.dest)
        .map_err(|e| DownloadError::Write {
            path: job.dest.clone(),
            source: e,
        })?;

    let mut writer = BufWriter::with_capacity(shared.buffer_length, file);
    let mut buffer = vec![0u8; shared.buffer_length];
    let mut transferred = 0u64;

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| DownloadError::Http {
                url: job.url.clone(),
                reason: format!("read error: {}", e),
            })?;

        if bytes_read == 0 {
            break;
        }

        shared
            .bytes_downloaded
            .fetch_add(bytes_read as u64, Ordering::SeqCst);
        let consumed = (bytes_read as u64).min(*credit);
        if consumed > 0 {
            shared.bytes_remaining.fetch_sub(consumed, Ordering::SeqCst);
            *credit -= consumed;
        }

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| DownloadError::Write {
                path: job.dest.clone(),
                source: e,
            })?;

        transferred += bytes_read as u64;
    }

    let file = writer
        .into_inner()
        .map_err(|e| DownloadError::Write {
            path: job.dest.clone(),
            source: e.into_error(),
        })?;

    // Stamp the server's modification time so the next freshness check can
    // short-circuit. A server that sends no Last-Modified gets no stamp,
    // and its files are always re-fetched.
    if last_modified > 0 {
        let mtime = UNIX_EPOCH + Duration::from_millis(last_modified as u64);
        file.set_modified(mtime).map_err(|e| DownloadError::Write {
            path: job.dest.clone(),
            source: e,
        })?;
    }

    debug!(url = %job.url, bytes = transferred, "fetch complete");
    Ok(FetchOutcome {
        bytes_transferred: transferred,
        skipped: false,
    })
}

fn classify_request_error(
    error: reqwest::Error,
    url: &str,
    timeout: Duration,
) -> DownloadError {
    if error.is_timeout() {
        DownloadError::Timeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        DownloadError::Http {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

/// Parse the `Last-Modified` header into milliseconds since the epoch.
/// Absent or unparseable headers yield 0.
fn header_last_modified_millis(headers: &HeaderMap) -> i64 {
    headers
        .get(LAST_MODIFIED)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| chrono::DateTime::parse_from_rfc2822(value).ok())
        .map(|date| date.timestamp_millis())
        .unwrap_or(0)
}

/// Modification time of a regular file in milliseconds since the epoch.
fn file_mtime_millis(path: &Path) -> Option<i64> {
    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    let modified = metadata.modified().ok()?;
    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_last_modified_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LAST_MODIFIED,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(header_last_modified_millis(&headers), 1_445_412_480_000);
    }

    #[test]
    fn test_last_modified_absent_is_zero() {
        assert_eq!(header_last_modified_millis(&HeaderMap::new()), 0);
    }

    #[test]
    fn test_last_modified_garbage_is_zero() {
        let mut headers = HeaderMap::new();
        headers.insert(LAST_MODIFIED, HeaderValue::from_static("not a date"));
        assert_eq!(header_last_modified_millis(&headers), 0);
    }

    #[test]
    fn test_file_mtime_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stamped.txt");
        let file = File::create(&path).unwrap();

        let millis = 1_445_412_480_000u64;
        file.set_modified(UNIX_EPOCH + Duration::from_millis(millis))
            .unwrap();

        assert_eq!(file_mtime_millis(&path), Some(millis as i64));
    }

    #[test]
    fn test_file_mtime_missing_file() {
        assert_eq!(file_mtime_millis(Path::new("/nonexistent/file")), None);
    }
}
