//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use hearth_config::{Config, TransportKind, TransportPlan, TransportSpec};

use crate::admin::ProvisionError;
use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::shell::ShellTarget;
use crate::transport::{ListenerFailure, PermissionError};

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    DelayedStart(u64),
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerStarting(TransportKind),
    /// Listener bound; carries the reported endpoint.
    ListenerServing(TransportKind, String),
    ListenerFailed(TransportKind),
    ListenerClosed(TransportKind),
    SocketPermissionsApplied(u32),
    SocketPermissionsDegraded,
    AdminProvisioned(String),
    AdminAlreadyProvisioned,
    AdminProvisioningFailed,
    ShellTargetSelected(String),
    ShellTargetMissing,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Counts events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&HealthEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn delayed_start(&self, delay: Duration) {
        self.record(HealthEvent::DelayedStart(delay.as_secs()));
    }

    fn bootstrap_succeeded(&self, _config: &Config, _transports: &TransportPlan) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_starting(&self, spec: &TransportSpec) {
        self.record(HealthEvent::ListenerStarting(spec.kind()));
    }

    fn listener_serving(&self, kind: TransportKind, endpoint: &str) {
        self.record(HealthEvent::ListenerServing(kind, endpoint.to_owned()));
    }

    fn listener_failed(&self, failure: &ListenerFailure) {
        self.record(HealthEvent::ListenerFailed(failure.kind));
    }

    fn listener_closed(&self, kind: TransportKind) {
        self.record(HealthEvent::ListenerClosed(kind));
    }

    fn socket_permissions_applied(&self, _path: &str, mode: u32) {
        self.record(HealthEvent::SocketPermissionsApplied(mode));
    }

    fn socket_permissions_degraded(&self, _error: &PermissionError) {
        self.record(HealthEvent::SocketPermissionsDegraded);
    }

    fn admin_provisioned(&self, username: &str, _file: &Path) {
        self.record(HealthEvent::AdminProvisioned(username.to_owned()));
    }

    fn admin_already_provisioned(&self, _file: &Path) {
        self.record(HealthEvent::AdminAlreadyProvisioned);
    }

    fn admin_provisioning_failed(&self, _error: &ProvisionError) {
        self.record(HealthEvent::AdminProvisioningFailed);
    }

    fn shell_target_selected(&self, target: &ShellTarget) {
        self.record(HealthEvent::ShellTargetSelected(target.url()));
    }

    fn shell_target_missing(&self) {
        self.record(HealthEvent::ShellTargetMissing);
    }
}
