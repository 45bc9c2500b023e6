//! Test harness utilities shared by the unit and behavioural suites.

mod config_loader;
mod identity;
mod reporter;
mod shell;
mod signal;
mod terminator;

pub use config_loader::{FailingConfigLoader, TestConfigLoader, reserve_port};
pub use identity::{CountingIdentityProvider, FailingIdentityProvider};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use shell::RecordingShellLauncher;
pub use signal::LatchSignal;
pub use terminator::RecordingTerminator;
