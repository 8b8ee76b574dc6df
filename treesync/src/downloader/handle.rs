//! Completion handles for scheduled fetches.

use std::sync::{Arc, Condvar, Mutex};

use super::error::DownloadError;

/// What a successful fetch did.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Body bytes actually transferred. Zero when the freshness check
    /// short-circuited the fetch.
    pub bytes_transferred: u64,

    /// Whether the destination was already up to date and no transfer
    /// happened.
    pub skipped: bool,
}

/// Shared completion state between a worker and the handle's owner.
pub(crate) struct FetchState {
    result: Mutex<Option<Result<FetchOutcome, DownloadError>>>,
    settled: Condvar,
}

impl FetchState {
    pub(crate) fn new() -> Self {
        Self {
            result: Mutex::new(None),
            settled: Condvar::new(),
        }
    }

    /// Record the fetch result and wake waiters. Later calls are ignored;
    /// a fetch settles exactly once.
    pub(crate) fn settle(&self, result: Result<FetchOutcome, DownloadError>) {
        let mut guard = self.result.lock().unwrap();
        if guard.is_none() {
            *guard = Some(result);
            self.settled.notify_all();
        }
    }
}

/// Handle to a scheduled fetch. Completes when the fetch terminates,
/// successfully or not.
pub struct FetchHandle {
    state: Arc<FetchState>,
}

impl FetchHandle {
    pub(crate) fn new(state: Arc<FetchState>) -> Self {
        Self { state }
    }

    /// Block until the fetch settles and return its result.
    pub fn wait(self) -> Result<FetchOutcome, DownloadError> {
        let mut guard = self.state.result.lock().unwrap();
        loop {
            match guard.take() {
                Some(result) => return result,
                None => guard = self.state.settled.wait(guard).unwrap(),
            }
        }
    }

    /// Whether the fetch has already settled.
    pub fn is_settled(&self) -> bool {
        self.state.result.lock().unwrap().is_some()
    }
}
