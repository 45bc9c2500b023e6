//! Server bootstrap: configuration, telemetry, start-up delay and transport
//! resolution.

use std::sync::Arc;
use std::thread;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use hearth_config::{Config, ResolveError, SocketPreparationError, TransportPlan};

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a pre-built configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The configured transports are invalid.
    #[error("invalid transport configuration: {source}")]
    Transports {
        /// Underlying resolution error.
        #[source]
        source: ResolveError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare unix socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
}

/// Result of a successful bootstrap invocation.
#[derive(Debug)]
pub struct Bootstrap {
    config: Config,
    transports: TransportPlan,
    telemetry: TelemetryHandle,
}

impl Bootstrap {
    /// Accessor for the configuration snapshot.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the resolved transports.
    #[must_use]
    pub fn transports(&self) -> &TransportPlan {
        &self.transports
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Bootstraps the server using the supplied collaborators.
///
/// Runs strictly in order: load configuration, install telemetry, wait out
/// the configured delay, resolve transports and prepare the socket
/// directory. Nothing is bound yet.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
) -> Result<Bootstrap, BootstrapError> {
    reporter.bootstrap_starting();
    let result = run_steps(loader, reporter);
    match &result {
        Ok(bootstrap) => reporter.bootstrap_succeeded(&bootstrap.config, &bootstrap.transports),
        Err(error) => reporter.bootstrap_failed(error),
    }
    result
}

fn run_steps(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
) -> Result<Bootstrap, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let delay = config.delayed_start();
    if !delay.is_zero() {
        reporter.delayed_start(delay);
        thread::sleep(delay);
    }

    let transports = config
        .transport_plan()
        .map_err(|source| BootstrapError::Transports { source })?;
    if let Some(unix) = &transports.unix {
        unix.prepare_filesystem()
            .map_err(|source| BootstrapError::Socket { source })?;
    }

    Ok(Bootstrap {
        config,
        transports,
        telemetry,
    })
}
