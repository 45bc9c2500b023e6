//! Defines the unified error surface for server launch.

use std::io;

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::shell::ShellError;
use crate::transport::{ListenerError, ListenerFailure};

/// Errors surfaced while launching or running the server.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration, telemetry or transport resolution failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Listener threads could not be started or joined.
    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),
    /// The directory owning first-run artefacts could not be resolved.
    #[error("failed to resolve working directory: {source}")]
    WorkingDirectory {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The shell failed to open or run.
    #[error("shell error: {0}")]
    Shell(#[from] ShellError),
    /// A listener failed and the server shut down.
    #[error("{0}")]
    Fatal(#[source] ListenerFailure),
}
