//! Shell used when no GUI toolkit is linked.
//!
//! Logs the navigation target and parks the run loop on a shutdown signal.

use std::sync::Arc;

use tracing::info;

use crate::process::ShutdownSignal;

use super::{Shell, ShellError, ShellLauncher, ShellOptions};

const SHELL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shell");

/// Shell without a window: `run` blocks until the shutdown signal fires.
pub struct HeadlessShell {
    options: ShellOptions,
    signal: Arc<dyn ShutdownSignal>,
    url: Option<String>,
}

impl HeadlessShell {
    /// URL of the last navigation, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl Shell for HeadlessShell {
    fn navigate(&mut self, url: &str) -> Result<(), ShellError> {
        info!(
            target: SHELL_TARGET,
            title = %self.options.title,
            url,
            "open {} in a browser to reach the server",
            url
        );
        self.url = Some(url.to_owned());
        Ok(())
    }

    fn run(&mut self) -> Result<(), ShellError> {
        self.signal.wait()?;
        Ok(())
    }

    fn destroy(&mut self) {
        info!(
            target: SHELL_TARGET,
            title = %self.options.title,
            "shell closed"
        );
        self.url = None;
    }
}

/// Launcher producing [`HeadlessShell`]s bound to one shutdown signal.
#[derive(Clone)]
pub struct HeadlessShellLauncher {
    signal: Arc<dyn ShutdownSignal>,
}

impl HeadlessShellLauncher {
    /// Builds a launcher whose shells run until `signal` fires.
    #[must_use]
    pub fn new(signal: Arc<dyn ShutdownSignal>) -> Self {
        Self { signal }
    }
}

impl ShellLauncher for HeadlessShellLauncher {
    fn open(&self, options: &ShellOptions) -> Result<Box<dyn Shell>, ShellError> {
        Ok(Box::new(HeadlessShell {
            options: options.clone(),
            signal: Arc::clone(&self.signal),
            url: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::process::ShutdownError;

    #[derive(Default)]
    struct CountingSignal {
        waits: AtomicUsize,
    }

    impl ShutdownSignal for CountingSignal {
        fn wait(&self) -> Result<(), ShutdownError> {
            self.waits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn trigger(&self) {}
    }

    struct BrokenSignal;

    impl ShutdownSignal for BrokenSignal {
        fn wait(&self) -> Result<(), ShutdownError> {
            Err(ShutdownError::Install {
                source: std::io::Error::other("signals unavailable"),
            })
        }

        fn trigger(&self) {}
    }

    #[test]
    fn run_returns_once_the_signal_fires() {
        let signal = Arc::new(CountingSignal::default());
        let launcher = HeadlessShellLauncher::new(signal.clone());
        let mut shell = launcher.open(&ShellOptions::default()).expect("open shell");

        shell.navigate("http://127.0.0.1:5244").expect("navigate");
        shell.run().expect("run");
        shell.destroy();

        assert_eq!(signal.waits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn records_the_navigation_target() {
        let mut shell = HeadlessShell {
            options: ShellOptions::default(),
            signal: Arc::new(CountingSignal::default()),
            url: None,
        };
        shell.navigate("https://127.0.0.1:5245").expect("navigate");
        assert_eq!(shell.url(), Some("https://127.0.0.1:5245"));
    }

    #[test]
    fn signal_failures_surface_as_shell_errors() {
        let launcher = HeadlessShellLauncher::new(Arc::new(BrokenSignal));
        let mut shell = launcher.open(&ShellOptions::default()).expect("open shell");
        let error = shell.run().expect_err("signal install fails");
        assert!(matches!(error, ShellError::Signal(_)));
    }
}
