//! Launch sequencing and process lifetime.

mod errors;
mod launch;
mod shutdown;

pub use errors::LaunchError;
pub use launch::{LaunchPlan, ProcessControl, ServiceDeps, run_server, run_server_with};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
