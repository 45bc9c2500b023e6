//! Terminator that records fatal listener failures instead of exiting.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use hearth_config::TransportKind;

use crate::transport::{ListenerFailure, Terminator};

#[derive(Debug, Default)]
pub struct RecordingTerminator {
    failures: Mutex<Vec<(TransportKind, String)>>,
}

impl RecordingTerminator {
    /// Recorded failures as `(kind, message)` pairs.
    #[must_use]
    pub fn failures(&self) -> Vec<(TransportKind, String)> {
        self.failures
            .lock()
            .expect("terminator mutex poisoned")
            .clone()
    }

    /// Polls until a failure has been recorded.
    pub fn wait_for_failure(&self) -> Option<(TransportKind, String)> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(failure) = self.failures().into_iter().next() {
                return Some(failure);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, failure: ListenerFailure) {
        self.failures
            .lock()
            .expect("terminator mutex poisoned")
            .push((failure.kind, failure.error.to_string()));
    }
}
