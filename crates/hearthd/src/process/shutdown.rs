use std::fmt;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    fn wait(&self) -> Result<(), ShutdownError>;

    /// Requests shutdown from inside the process. Releases the current
    /// waiter and makes every later [`ShutdownSignal::wait`] return at once.
    fn trigger(&self);
}

impl<T> ShutdownSignal for std::sync::Arc<T>
where
    T: ShutdownSignal + ?Sized,
{
    fn wait(&self) -> Result<(), ShutdownError> {
        (**self).wait()
    }

    fn trigger(&self) {
        (**self).trigger();
    }
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

#[derive(Default)]
struct TriggerState {
    triggered: bool,
    handle: Option<Handle>,
}

/// Shutdown listener that waits for termination signals or an internal
/// trigger.
#[derive(Default)]
pub struct SystemShutdownSignal {
    state: Mutex<TriggerState>,
}

impl SystemShutdownSignal {
    /// Builds a signal listener. Handlers are installed on the first wait.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TriggerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SystemShutdownSignal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SystemShutdownSignal")
            .field("triggered", &self.lock().triggered)
            .finish_non_exhaustive()
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        {
            let mut state = self.lock();
            if state.triggered {
                return Ok(());
            }
            state.handle = Some(signals.handle());
        }
        match signals.forever().next() {
            Some(signal) => info!(
                target: PROCESS_TARGET,
                signal,
                "shutdown signal received"
            ),
            None => info!(
                target: PROCESS_TARGET,
                "internal shutdown requested"
            ),
        }
        self.lock().handle = None;
        Ok(())
    }

    fn trigger(&self) {
        let mut state = self.lock();
        state.triggered = true;
        if let Some(handle) = &state.handle {
            handle.close();
        }
    }
}
