//! Embedded UI shell attachment.
//!
//! After the listeners are launched the shell is pointed at the loopback
//! address of the preferred transport and owns the process lifetime until
//! its run loop returns.

mod headless;
#[cfg(feature = "webview")]
mod webview;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use strum::Display;
use thiserror::Error;

use hearth_config::{TransportKind, TransportPlan};

use crate::health::HealthReporter;
use crate::process::{ShutdownError, ShutdownSignal};
use crate::transport::ListenerSet;

pub use self::headless::{HeadlessShell, HeadlessShellLauncher};
#[cfg(feature = "webview")]
pub use self::webview::{WebviewShell, WebviewShellLauncher};

/// Host used for shell navigation.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

const BIND_WAIT: Duration = Duration::from_secs(5);

/// URL scheme the shell navigates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Scheme {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Scheme {
    /// Transport serving this scheme.
    #[must_use]
    pub fn transport(self) -> TransportKind {
        match self {
            Self::Http => TransportKind::Plaintext,
            Self::Https => TransportKind::Tls,
        }
    }
}

/// Loopback scheme and port the shell navigates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellTarget {
    /// Scheme of the selected transport.
    pub scheme: Scheme,
    /// Port the shell connects to.
    pub port: u16,
}

impl ShellTarget {
    /// Picks HTTPS when enabled, otherwise HTTP. The Unix socket never
    /// participates.
    #[must_use]
    pub fn select(plan: &TransportPlan) -> Option<Self> {
        plan.https_port()
            .map(|port| Self {
                scheme: Scheme::Https,
                port,
            })
            .or_else(|| {
                plan.http_port().map(|port| Self {
                    scheme: Scheme::Http,
                    port,
                })
            })
    }

    /// Replaces an ephemeral port (`0`) with the port the listener bound.
    ///
    /// Fixed ports are returned unchanged. If the listener never starts
    /// serving, the configured port is kept.
    #[must_use]
    pub fn bound_to(self, listeners: &ListenerSet) -> Self {
        if self.port != 0 {
            return self;
        }
        listeners
            .wait_for_address(self.scheme.transport(), BIND_WAIT)
            .map_or(self, |addr| Self {
                port: addr.port(),
                ..self
            })
    }

    /// Loopback URL, e.g. `http://127.0.0.1:5244`.
    #[must_use]
    pub fn url(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ShellTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}://{LOOPBACK_HOST}:{}", self.scheme, self.port)
    }
}

/// Window options handed to the shell launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOptions {
    /// Window title.
    pub title: String,
    /// Initial width in logical pixels.
    pub width: u32,
    /// Initial height in logical pixels.
    pub height: u32,
    /// Centre the window on the current monitor.
    pub centered: bool,
    /// Directory for the shell's own profile data.
    pub data_path: PathBuf,
    /// Enable developer tools.
    pub debug: bool,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            title: String::from("Hearth"),
            width: 1440,
            height: 900,
            centered: true,
            data_path: PathBuf::from("./data"),
            debug: false,
        }
    }
}

/// Errors raised by shells.
#[derive(Debug, Error)]
pub enum ShellError {
    /// The shell could not be created.
    #[error("failed to open shell: {reason}")]
    Open {
        /// Backend error text.
        reason: String,
    },
    /// Navigation was rejected.
    #[error("failed to navigate shell to {url}: {reason}")]
    Navigate {
        /// Rejected URL.
        url: String,
        /// Backend error text.
        reason: String,
    },
    /// The run loop ended abnormally.
    #[error("shell run loop failed: {reason}")]
    Run {
        /// Backend error text.
        reason: String,
    },
    /// Waiting for a termination signal failed.
    #[error(transparent)]
    Signal(#[from] ShutdownError),
}

/// A UI shell window.
pub trait Shell {
    /// Directs the shell to `url`.
    fn navigate(&mut self, url: &str) -> Result<(), ShellError>;

    /// Blocks on the shell's run loop until the shell exits.
    fn run(&mut self) -> Result<(), ShellError>;

    /// Releases the shell's resources. Called exactly once.
    fn destroy(&mut self);
}

/// Creates shells.
pub trait ShellLauncher: Send + Sync {
    /// Opens a new shell configured with `options`.
    fn open(&self, options: &ShellOptions) -> Result<Box<dyn Shell>, ShellError>;
}

/// Owns a shell and destroys it when dropped, on every exit path.
pub struct ShellSession {
    shell: Box<dyn Shell>,
}

impl ShellSession {
    /// Opens a shell through `launcher`.
    ///
    /// # Errors
    ///
    /// Propagates the launcher's [`ShellError`].
    pub fn open(launcher: &dyn ShellLauncher, options: &ShellOptions) -> Result<Self, ShellError> {
        Ok(Self {
            shell: launcher.open(options)?,
        })
    }

    /// Directs the shell to `target`.
    ///
    /// # Errors
    ///
    /// Propagates the shell's [`ShellError`].
    pub fn navigate(&mut self, target: &ShellTarget) -> Result<(), ShellError> {
        self.shell.navigate(&target.url())
    }

    /// Blocks on the run loop.
    ///
    /// # Errors
    ///
    /// Propagates the shell's [`ShellError`].
    pub fn run(&mut self) -> Result<(), ShellError> {
        self.shell.run()
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        self.shell.destroy();
    }
}

impl fmt::Debug for ShellSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("ShellSession").finish_non_exhaustive()
    }
}

/// Launcher wired by `run_server`: the native webview when the `webview`
/// feature is enabled, the headless shell otherwise. Either closes when
/// `signal` fires.
#[must_use]
pub fn default_launcher(signal: Arc<dyn ShutdownSignal>) -> Arc<dyn ShellLauncher> {
    #[cfg(feature = "webview")]
    {
        Arc::new(WebviewShellLauncher::new(signal))
    }
    #[cfg(not(feature = "webview"))]
    {
        Arc::new(HeadlessShellLauncher::new(signal))
    }
}

/// Opens a shell, navigates to `target` when present and blocks on the run
/// loop.
///
/// Without a target navigation is skipped and the shell still runs, which
/// keeps the process resident for a socket-only configuration.
///
/// # Errors
///
/// Returns the first [`ShellError`]; the shell is destroyed regardless.
pub fn attach_shell(
    launcher: &dyn ShellLauncher,
    options: &ShellOptions,
    target: Option<ShellTarget>,
    reporter: &dyn HealthReporter,
) -> Result<(), ShellError> {
    let mut session = ShellSession::open(launcher, options)?;
    match target {
        Some(target) => {
            reporter.shell_target_selected(&target);
            session.navigate(&target)?;
        }
        None => reporter.shell_target_missing(),
    }
    session.run()
}
