//! Integration tests for the parallel downloader.
//!
//! These tests exercise real HTTP fetches against a local mock server:
//! streamed transfer, the mtime freshness short-circuit, error surfacing,
//! the byte counters, and the concurrency bound.
//!
//! Run with: `cargo test --test downloader_integration`

use std::fs::{self, File};
use std::net::TcpListener;
use std::path::Path;
use std::time::{Duration, Instant, UNIX_EPOCH};

use httpmock::Method::GET;
use httpmock::MockServer;
use tempfile::TempDir;

use treesync::{DownloadError, Downloader, DownloaderConfig};

const LAST_MODIFIED: &str = "Wed, 21 Oct 2015 07:28:00 GMT";
const LAST_MODIFIED_MILLIS: i64 = 1_445_412_480_000;

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn file_mtime_millis(path: &Path) -> i64 {
    fs::metadata(path)
        .unwrap()
        .modified()
        .unwrap()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

fn set_mtime_millis(path: &Path, millis: u64) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(UNIX_EPOCH + Duration::from_millis(millis))
        .unwrap();
}

fn small_pool() -> Downloader {
    Downloader::with_config(DownloaderConfig::default().with_connection_count(2))
}

#[test]
fn test_download_writes_file_and_counts_bytes() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock test: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/data/a.bin");
        then.status(200)
            .header("Last-Modified", LAST_MODIFIED)
            .body("hello world");
    });

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("a.bin");
    File::create(&dest).unwrap();

    let downloader = small_pool();
    let outcome = downloader
        .enqueue(server.url("/data/a.bin"), &dest, true)
        .wait()
        .unwrap();

    mock.assert();
    assert_eq!(outcome.bytes_transferred, 11);
    assert!(!outcome.skipped);
    assert_eq!(fs::read(&dest).unwrap(), b"hello world");
    assert_eq!(file_mtime_millis(&dest), LAST_MODIFIED_MILLIS);
    assert_eq!(downloader.downloaded_bytes(), 11);
    assert_eq!(downloader.remaining_bytes(), 0);
}

#[test]
fn test_fresh_destination_short_circuits() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock test: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data/a.bin");
        then.status(200)
            .header("Last-Modified", LAST_MODIFIED)
            .body("server copy");
    });

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("a.bin");
    fs::write(&dest, b"local copy").unwrap();
    set_mtime_millis(&dest, LAST_MODIFIED_MILLIS as u64);

    let downloader = small_pool();
    let outcome = downloader
        .enqueue(server.url("/data/a.bin"), &dest, false)
        .wait()
        .unwrap();

    assert!(outcome.skipped);
    assert_eq!(outcome.bytes_transferred, 0);
    assert_eq!(fs::read(&dest).unwrap(), b"local copy");
    assert_eq!(downloader.downloaded_bytes(), 0);
    assert_eq!(downloader.remaining_bytes(), 0);
}

#[test]
fn test_force_bypasses_freshness_check() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock test: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data/a.bin");
        then.status(200)
            .header("Last-Modified", LAST_MODIFIED)
            .body("server copy");
    });

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("a.bin");
    fs::write(&dest, b"local copy").unwrap();
    set_mtime_millis(&dest, LAST_MODIFIED_MILLIS as u64);

    let downloader = small_pool();
    let outcome = downloader
        .enqueue(server.url("/data/a.bin"), &dest, true)
        .wait()
        .unwrap();

    assert!(!outcome.skipped);
    assert_eq!(fs::read(&dest).unwrap(), b"server copy");
}

#[test]
fn test_missing_last_modified_never_skips() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock test: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/data/a.bin");
        then.status(200).body("undated");
    });

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("a.bin");
    File::create(&dest).unwrap();

    let downloader = small_pool();
    downloader
        .enqueue(server.url("/data/a.bin"), &dest, false)
        .wait()
        .unwrap();
    let second = downloader
        .enqueue(server.url("/data/a.bin"), &dest, false)
        .wait()
        .unwrap();

    // Without Last-Modified there is nothing to compare against, so every
    // fetch transfers.
    assert!(!second.skipped);
    assert_eq!(mock.hits(), 2);
    assert_eq!(downloader.downloaded_bytes(), 14);
}

#[test]
fn test_server_error_fails_fetch() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock test: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data/broken.bin");
        then.status(500).body("boom");
    });

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("broken.bin");
    File::create(&dest).unwrap();

    let downloader = small_pool();
    let result = downloader
        .enqueue(server.url("/data/broken.bin"), &dest, true)
        .wait();

    match result {
        Err(DownloadError::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected status error, got {:?}", other),
    }
    assert_eq!(downloader.remaining_bytes(), 0);
}

#[test]
fn test_failed_fetch_does_not_affect_siblings() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock test: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data/good.bin");
        then.status(200).body("good");
    });
    server.mock(|when, then| {
        when.method(GET).path("/data/bad.bin");
        then.status(404);
    });

    let temp = TempDir::new().unwrap();
    let good = temp.path().join("good.bin");
    let bad = temp.path().join("bad.bin");
    File::create(&good).unwrap();
    File::create(&bad).unwrap();

    let downloader = small_pool();
    let good_handle = downloader.enqueue(server.url("/data/good.bin"), &good, true);
    let bad_handle = downloader.enqueue(server.url("/data/bad.bin"), &bad, true);

    assert!(bad_handle.wait().is_err());
    assert!(good_handle.wait().is_ok());
    assert_eq!(fs::read(&good).unwrap(), b"good");
}

#[test]
fn test_concurrency_is_bounded_by_connection_count() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock test: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    for i in 0..4 {
        server.mock(|when, then| {
            when.method(GET).path(format!("/slow/{}.bin", i));
            then.status(200)
                .body("payload")
                .delay(Duration::from_millis(300));
        });
    }

    let temp = TempDir::new().unwrap();
    let downloader =
        Downloader::with_config(DownloaderConfig::default().with_connection_count(2));

    let start = Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let dest = temp.path().join(format!("{}.bin", i));
            File::create(&dest).unwrap();
            downloader.enqueue(server.url(format!("/slow/{}.bin", i)), dest, true)
        })
        .collect();
    for handle in handles {
        handle.wait().unwrap();
    }
    let elapsed = start.elapsed();

    // Four 300ms responses through two connections need at least two
    // rounds; a pool that ignored the bound would finish in one.
    assert!(
        elapsed >= Duration::from_millis(550),
        "four delayed fetches finished in {:?}; concurrency bound not honored",
        elapsed
    );
}

#[test]
fn test_shutdown_after_work_drains() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock test: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data/a.bin");
        then.status(200).body("bytes");
    });

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("a.bin");
    File::create(&dest).unwrap();

    let downloader = small_pool();
    downloader
        .enqueue(server.url("/data/a.bin"), &dest, true)
        .wait()
        .unwrap();

    assert!(downloader.shutdown(Duration::from_secs(5)));
    let rejected = downloader.enqueue(server.url("/data/a.bin"), &dest, true);
    assert!(matches!(rejected.wait(), Err(DownloadError::ShutDown)));
}
