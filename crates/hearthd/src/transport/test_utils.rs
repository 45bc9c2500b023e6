//! Test helpers for the transport module.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::{Duration, Instant};

use hearth_config::TransportKind;

use super::{ConnectionHandler, ConnectionStream, ListenerSet, ListenerState};

pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: ConnectionStream) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Polls `set` until the listener for `kind` reaches `expected`.
pub(crate) fn wait_for_state(
    set: &ListenerSet,
    kind: TransportKind,
    expected: ListenerState,
) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if set.status(kind) == Some(expected) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}
