//! Multi-transport server bootstrap for hearth.
//!
//! `hearthd` brings one shared request router online across up to three
//! independently configured transports: plain HTTP, HTTPS and a local Unix
//! domain socket. Transports come from a single immutable
//! [`hearth_config::Config`] snapshot and start in a fixed order, each on its
//! own thread.
//!
//! ## Failure policy
//!
//! A bind or serve failure on any transport is fatal. Listener threads never
//! exit the process themselves: each reports its failure over a channel and a
//! supervisor hands the first one to a [`Terminator`]. Production wires the
//! [`ShutdownTerminator`], which releases the shell's run loop so the launch
//! sequence unwinds, destroys the shell, joins the listeners and returns
//! [`LaunchError::Fatal`]. Tests record the failure instead.
//!
//! Tightening the Unix socket's permission bits is best-effort. Parse or
//! `chmod` failures are reported through the [`HealthReporter`] and the
//! socket keeps serving with its creation mode.
//!
//! ## First run
//!
//! The first start in a working directory generates an administrator
//! password, stores it through an [`IdentityStore`] and writes
//! `password.txt`. The file's existence suppresses provisioning forever
//! after.
//!
//! ## Shell
//!
//! Once listeners are launched the bootstrap attaches a [`Shell`] to the
//! loopback URL of the preferred transport (HTTPS over HTTP) and blocks on
//! its run loop. When the run loop returns, listeners shut down. The
//! `webview` feature swaps the headless shell for a native window.

mod admin;
mod bootstrap;
mod health;
mod process;
mod shell;
mod telemetry;
mod transport;

pub use admin::{
    AdminCredential, AdminProvisioner, AdminRecord, CREDENTIAL_FILE, FileIdentityProvider,
    FileIdentityStore, IdentityError, IdentityProvider, IdentityStore, PASSWORD_LENGTH,
    ProvisionError, ProvisionOutcome, generate_password,
};
pub use bootstrap::{
    Bootstrap, BootstrapError, ConfigLoader, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, LaunchPlan, ProcessControl, ServiceDeps, ShutdownError, ShutdownSignal,
    SystemShutdownSignal, run_server, run_server_with,
};
pub use shell::{
    HeadlessShell, HeadlessShellLauncher, LOOPBACK_HOST, Scheme, Shell, ShellError,
    ShellLauncher, ShellOptions, ShellSession, ShellTarget, attach_shell,
};
#[cfg(feature = "webview")]
pub use shell::{WebviewShell, WebviewShellLauncher};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise_fallback};
pub use transport::{
    ConnectionHandler, ConnectionStream, ListenerError, ListenerFailure, ListenerOrchestrator,
    ListenerSet, ListenerState, PermissionError, ShutdownTerminator, StatusRouter, Terminator,
};

#[cfg(test)]
mod tests;
