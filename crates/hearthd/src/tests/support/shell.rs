//! Shell launcher double: records navigation and blocks `run` until released.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::shell::{Shell, ShellError, ShellLauncher, ShellOptions};

const RUN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct ShellState {
    navigations: Mutex<Vec<String>>,
    running: AtomicBool,
    destroyed: AtomicUsize,
    released: Mutex<bool>,
    wake: Condvar,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingShellLauncher {
    state: Arc<ShellState>,
}

impl RecordingShellLauncher {
    /// Launcher whose shells block in `run` until [`Self::release`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher whose shells return from `run` immediately.
    #[must_use]
    pub fn released() -> Self {
        let launcher = Self::default();
        launcher.release();
        launcher
    }

    pub fn release(&self) {
        *self.state.released.lock().expect("shell mutex poisoned") = true;
        self.state.wake.notify_all();
    }

    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.state
            .navigations
            .lock()
            .expect("shell mutex poisoned")
            .clone()
    }

    #[must_use]
    pub fn destroyed(&self) -> usize {
        self.state.destroyed.load(Ordering::SeqCst)
    }

    /// Polls until a shell has entered its run loop.
    pub fn wait_until_running(&self) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.state.running.load(Ordering::SeqCst) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

impl ShellLauncher for RecordingShellLauncher {
    fn open(&self, _options: &ShellOptions) -> Result<Box<dyn Shell>, ShellError> {
        Ok(Box::new(RecordingShell {
            state: Arc::clone(&self.state),
        }))
    }
}

struct RecordingShell {
    state: Arc<ShellState>,
}

impl Shell for RecordingShell {
    fn navigate(&mut self, url: &str) -> Result<(), ShellError> {
        self.state
            .navigations
            .lock()
            .expect("shell mutex poisoned")
            .push(url.to_owned());
        Ok(())
    }

    fn run(&mut self) -> Result<(), ShellError> {
        self.state.running.store(true, Ordering::SeqCst);
        let released = self.state.released.lock().expect("shell mutex poisoned");
        let (released, timeout) = self
            .state
            .wake
            .wait_timeout_while(released, RUN_TIMEOUT, |released| !*released)
            .expect("shell mutex poisoned");
        if timeout.timed_out() && !*released {
            return Err(ShellError::Run {
                reason: String::from("test shell was never released"),
            });
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.state.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}
