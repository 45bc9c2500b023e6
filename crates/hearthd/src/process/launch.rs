//! Supervises server launch sequencing and the process lifetime.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use hearth_config::Config;

use crate::admin::{
    AdminProvisioner, FileIdentityProvider, IdentityProvider, ProvisionError, ProvisionOutcome,
};
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::shell::{ShellLauncher, ShellOptions, ShellTarget, attach_shell};
use crate::transport::{
    ConnectionHandler, ListenerOrchestrator, ShutdownTerminator, StatusRouter, Terminator,
};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Process-level collaborators.
pub struct ProcessControl {
    /// Directory for first-run artefacts; `None` derives it from the
    /// configuration.
    pub working_dir: Option<PathBuf>,
    /// Receives the first fatal listener failure.
    pub terminator: Arc<dyn Terminator>,
}

/// Service dependencies required to construct the server runtime.
pub struct ServiceDeps<L> {
    /// Produces the configuration snapshot.
    pub loader: L,
    /// Receives lifecycle events.
    pub reporter: Arc<dyn HealthReporter>,
    /// Shared request router for every transport.
    pub router: Arc<dyn ConnectionHandler>,
    /// Opens the identity store used for first-run provisioning.
    pub identity: Arc<dyn IdentityProvider>,
    /// Opens the UI shell that owns the process lifetime.
    pub shell: Arc<dyn ShellLauncher>,
}

/// Collaborators required to launch the server.
pub struct LaunchPlan<L> {
    /// Process-level collaborators.
    pub process: ProcessControl,
    /// Service collaborators.
    pub services: ServiceDeps<L>,
}

/// Runs the server using the production collaborators.
///
/// # Errors
///
/// Returns a [`LaunchError`] when bootstrap, the shell or listener shutdown
/// fails, and [`LaunchError::Fatal`] after a listener failure.
pub fn run_server() -> Result<(), LaunchError> {
    let signal: Arc<dyn ShutdownSignal> = Arc::new(SystemShutdownSignal::new());
    let plan = LaunchPlan {
        process: ProcessControl {
            working_dir: None,
            terminator: Arc::new(ShutdownTerminator::new(Arc::clone(&signal))),
        },
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
            router: Arc::new(StatusRouter),
            identity: Arc::new(FileIdentityProvider),
            shell: crate::shell::default_launcher(signal),
        },
    };
    run_server_with(plan)
}

/// Runs the server with injected collaborators.
///
/// Blocks on the shell's run loop; listeners are shut down and joined once
/// it returns. A fatal listener failure recorded by the terminator wins over
/// the shell's own result.
///
/// # Errors
///
/// See [`run_server`].
pub fn run_server_with<L>(plan: LaunchPlan<L>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl {
        working_dir,
        terminator,
    } = process;
    let ServiceDeps {
        loader,
        reporter,
        router,
        identity,
        shell,
    } = services;

    let bootstrap = bootstrap_with(&loader, reporter.as_ref())?;
    let config = bootstrap.config();
    let transports = bootstrap.transports();

    let orchestrator = ListenerOrchestrator::new(router, Arc::clone(&reporter));
    let listeners = orchestrator.launch(transports, Arc::clone(&terminator))?;

    let working_dir = match working_dir {
        Some(directory) => directory,
        None => config
            .working_directory()
            .map_err(|source| LaunchError::WorkingDirectory { source })?,
    };
    provision_admin(config, &working_dir, identity.as_ref(), reporter.as_ref());

    let target = ShellTarget::select(transports).map(|target| target.bound_to(&listeners));
    let shell_result = attach_shell(
        shell.as_ref(),
        &ShellOptions::default(),
        target,
        reporter.as_ref(),
    );

    listeners.shutdown();
    listeners.join()?;
    if let Some(failure) = terminator.take_failure() {
        return Err(LaunchError::Fatal(failure));
    }
    shell_result?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}

/// Provisions the administrator once; failures are reported, never raised.
fn provision_admin(
    config: &Config,
    working_dir: &Path,
    identity: &dyn IdentityProvider,
    reporter: &dyn HealthReporter,
) {
    let result = identity
        .open(config)
        .map_err(ProvisionError::from)
        .and_then(|store| AdminProvisioner::new(store, working_dir).provision());
    match result {
        Ok(ProvisionOutcome::Provisioned { credential, file }) => {
            reporter.admin_provisioned(&credential.username, &file);
        }
        Ok(ProvisionOutcome::AlreadyProvisioned { file }) => {
            reporter.admin_already_provisioned(&file);
        }
        Err(error) => reporter.admin_provisioning_failed(&error),
    }
}
