//! Escalation of fatal listener failures.
//!
//! Listener threads never stop the process themselves. They send their
//! failure to a supervisor thread, which hands the first one it receives to
//! a [`Terminator`]. The channel closes once every listener thread has
//! exited, which ends the supervisor.

use std::io;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::error;

use crate::process::ShutdownSignal;

use super::{LISTENER_TARGET, ListenerFailure};

/// Decides what a fatal listener failure does to the process.
pub trait Terminator: Send + Sync {
    /// Receives the first fatal failure raised by any listener.
    fn terminate(&self, failure: ListenerFailure);

    /// Hands back the failure that ended the run, at most once.
    fn take_failure(&self) -> Option<ListenerFailure> {
        None
    }
}

impl<T> Terminator for Arc<T>
where
    T: Terminator + ?Sized,
{
    fn terminate(&self, failure: ListenerFailure) {
        (**self).terminate(failure);
    }

    fn take_failure(&self) -> Option<ListenerFailure> {
        (**self).take_failure()
    }
}

/// Keeps the failure and triggers the shutdown signal, so the shell's run
/// loop returns and the launch sequence unwinds with an error.
pub struct ShutdownTerminator {
    signal: Arc<dyn ShutdownSignal>,
    failure: Mutex<Option<ListenerFailure>>,
}

impl ShutdownTerminator {
    /// Builds a terminator releasing `signal` on the first failure.
    #[must_use]
    pub fn new(signal: Arc<dyn ShutdownSignal>) -> Self {
        Self {
            signal,
            failure: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ListenerFailure>> {
        self.failure.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Terminator for ShutdownTerminator {
    fn terminate(&self, failure: ListenerFailure) {
        error!(
            target: LISTENER_TARGET,
            transport = %failure.kind,
            error = %failure.error,
            "fatal listener failure; shutting down"
        );
        self.slot().get_or_insert(failure);
        self.signal.trigger();
    }

    fn take_failure(&self) -> Option<ListenerFailure> {
        self.slot().take()
    }
}

pub(super) fn spawn(
    failures: Receiver<ListenerFailure>,
    terminator: Arc<dyn Terminator>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(String::from("listener-supervisor"))
        .spawn(move || {
            if let Ok(failure) = failures.recv() {
                terminator.terminate(failure);
            }
        })
}
