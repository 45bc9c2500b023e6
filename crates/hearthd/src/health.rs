//! Structured health reporting for server lifecycle events.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hearth_config::{Config, TransportKind, TransportPlan, TransportSpec};

use crate::admin::ProvisionError;
use crate::bootstrap::BootstrapError;
use crate::shell::ShellTarget;
use crate::transport::{ListenerFailure, PermissionError};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked before the configured start-up delay elapses.
    fn delayed_start(&self, delay: Duration);

    /// Invoked after configuration, telemetry and transports are resolved.
    fn bootstrap_succeeded(&self, config: &Config, transports: &TransportPlan);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked as each enabled transport is initiated.
    fn listener_starting(&self, spec: &TransportSpec);

    /// Invoked once a listener is bound and accepting connections.
    fn listener_serving(&self, kind: TransportKind, endpoint: &str);

    /// Invoked when a listener fails fatally.
    fn listener_failed(&self, failure: &ListenerFailure);

    /// Invoked when a listener closes after an intentional shutdown.
    fn listener_closed(&self, kind: TransportKind);

    /// Invoked after the socket file mode was applied.
    fn socket_permissions_applied(&self, path: &str, mode: u32);

    /// Invoked when the socket keeps its creation mode after an error.
    fn socket_permissions_degraded(&self, error: &PermissionError);

    /// Invoked after first-run credentials were generated.
    fn admin_provisioned(&self, username: &str, file: &Path);

    /// Invoked when the credential file already exists.
    fn admin_already_provisioned(&self, file: &Path);

    /// Invoked when first-run provisioning fails.
    fn admin_provisioning_failed(&self, error: &ProvisionError);

    /// Invoked when the shell is directed to a loopback URL.
    fn shell_target_selected(&self, target: &ShellTarget);

    /// Invoked when no HTTP or HTTPS transport is available to the shell.
    fn shell_target_missing(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn delayed_start(&self, delay: Duration) {
        (**self).delayed_start(delay);
    }

    fn bootstrap_succeeded(&self, config: &Config, transports: &TransportPlan) {
        (**self).bootstrap_succeeded(config, transports);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_starting(&self, spec: &TransportSpec) {
        (**self).listener_starting(spec);
    }

    fn listener_serving(&self, kind: TransportKind, endpoint: &str) {
        (**self).listener_serving(kind, endpoint);
    }

    fn listener_failed(&self, failure: &ListenerFailure) {
        (**self).listener_failed(failure);
    }

    fn listener_closed(&self, kind: TransportKind) {
        (**self).listener_closed(kind);
    }

    fn socket_permissions_applied(&self, path: &str, mode: u32) {
        (**self).socket_permissions_applied(path, mode);
    }

    fn socket_permissions_degraded(&self, error: &PermissionError) {
        (**self).socket_permissions_degraded(error);
    }

    fn admin_provisioned(&self, username: &str, file: &Path) {
        (**self).admin_provisioned(username, file);
    }

    fn admin_already_provisioned(&self, file: &Path) {
        (**self).admin_already_provisioned(file);
    }

    fn admin_provisioning_failed(&self, error: &ProvisionError) {
        (**self).admin_provisioning_failed(error);
    }

    fn shell_target_selected(&self, target: &ShellTarget) {
        (**self).shell_target_selected(target);
    }

    fn shell_target_missing(&self) {
        (**self).shell_target_missing();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting server bootstrap"
        );
    }

    fn delayed_start(&self, delay: Duration) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "delayed_start",
            seconds = delay.as_secs(),
            "delayed start for {} seconds",
            delay.as_secs()
        );
    }

    fn bootstrap_succeeded(&self, config: &Config, transports: &TransportPlan) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            transports = transports.enabled().len(),
            log_filter = %config.effective_log_filter(),
            log_format = ?config.log_format(),
            "server bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "server bootstrap failed"
        );
    }

    fn listener_starting(&self, spec: &TransportSpec) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_starting",
            transport = %spec.kind(),
            endpoint = %spec,
            "start {} server @ {}",
            spec.kind(),
            spec
        );
    }

    fn listener_serving(&self, kind: TransportKind, endpoint: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_serving",
            transport = %kind,
            endpoint,
            "listener accepting connections"
        );
    }

    fn listener_failed(&self, failure: &ListenerFailure) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "listener_failed",
            transport = %failure.kind,
            error = %failure.error,
            "failed to start {}: {}",
            failure.kind,
            failure.error
        );
    }

    fn listener_closed(&self, kind: TransportKind) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_closed",
            transport = %kind,
            "listener closed"
        );
    }

    fn socket_permissions_applied(&self, path: &str, mode: u32) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "socket_permissions_applied",
            path,
            mode = %format!("{mode:o}"),
            "socket file permissions applied"
        );
    }

    fn socket_permissions_degraded(&self, error: &PermissionError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "socket_permissions_degraded",
            error = %error,
            "socket keeps its default permissions"
        );
    }

    fn admin_provisioned(&self, username: &str, file: &Path) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "admin_provisioned",
            username,
            file = %file.display(),
            "generated initial admin password"
        );
    }

    fn admin_already_provisioned(&self, file: &Path) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "admin_already_provisioned",
            file = %file.display(),
            "credential file present; skipping provisioning"
        );
    }

    fn admin_provisioning_failed(&self, error: &ProvisionError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "admin_provisioning_failed",
            error = %error,
            "failed to provision admin credentials"
        );
    }

    fn shell_target_selected(&self, target: &ShellTarget) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shell_target_selected",
            url = %target,
            "shell navigating to local server"
        );
    }

    fn shell_target_missing(&self) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "shell_target_missing",
            "no HTTP or HTTPS transport enabled; shell runs without navigation"
        );
    }
}
