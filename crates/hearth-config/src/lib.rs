//! Shared configuration for the hearth server.
//!
//! [`Config`] is loaded once at start-up through `ortho_config`, layering
//! built-in defaults, a configuration file, `HEARTH_*` environment variables
//! and command-line flags. The resulting snapshot is immutable: components
//! receive it by reference and never re-read it.

mod defaults;
mod logging;
mod transport;

use std::io;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEBUG_LOG_FILTER, DEFAULT_ADDRESS, DEFAULT_DATA_DIR, DEFAULT_HTTP_PORT, DEFAULT_LOG_FILTER,
    DISABLED_PORT, default_address, default_data_dir, default_http_port, default_https_port,
    default_log_filter, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use transport::{
    ResolveError, SocketPreparationError, TcpBinding, TlsBinding, TransportKind, TransportPlan,
    TransportSpec, UnixBinding,
};

/// Server configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HEARTH")]
pub struct Config {
    /// Address shared by the HTTP and HTTPS listeners.
    #[serde(default = "default_address")]
    #[ortho_config(default = default_address())]
    pub address: String,
    /// Plain HTTP port; `-1` disables the listener.
    #[serde(default = "default_http_port")]
    #[ortho_config(default = default_http_port())]
    pub http_port: i32,
    /// HTTPS port; `-1` disables the listener.
    #[serde(default = "default_https_port")]
    #[ortho_config(default = default_https_port())]
    pub https_port: i32,
    /// PEM certificate chain for the HTTPS listener.
    #[serde(default)]
    pub cert_file: Utf8PathBuf,
    /// PEM private key for the HTTPS listener.
    #[serde(default)]
    pub key_file: Utf8PathBuf,
    /// Unix socket path; empty disables the listener.
    #[serde(default)]
    pub unix_file: Utf8PathBuf,
    /// Octal permission bits applied to the Unix socket file, e.g. `"660"`.
    #[serde(default)]
    pub unix_file_perm: String,
    /// Seconds to wait before any bootstrap step runs.
    #[serde(default)]
    pub delayed_start: u64,
    /// Data directory, relative to the working directory unless absolute.
    #[serde(default = "default_data_dir")]
    #[ortho_config(default = default_data_dir())]
    pub data_dir: Utf8PathBuf,
    /// Resolve the working directory from the executable location.
    #[serde(default)]
    pub force_bin_dir: bool,
    /// Raise the log filter to `debug`.
    #[serde(default)]
    pub debug: bool,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Append logs to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: default_address(),
            http_port: default_http_port(),
            https_port: default_https_port(),
            cert_file: Utf8PathBuf::new(),
            key_file: Utf8PathBuf::new(),
            unix_file: Utf8PathBuf::new(),
            unix_file_perm: String::new(),
            delayed_start: 0,
            data_dir: default_data_dir(),
            force_bin_dir: false,
            debug: false,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            log_file: None,
        }
    }
}

impl Config {
    /// Resolves the enabled transports.
    pub fn transport_plan(&self) -> Result<TransportPlan, ResolveError> {
        TransportPlan::resolve(self)
    }

    /// Configured `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Filter actually installed: `debug` mode overrides the configured one.
    #[must_use]
    pub fn effective_log_filter(&self) -> &str {
        if self.debug {
            DEBUG_LOG_FILTER
        } else {
            &self.log_filter
        }
    }

    /// Configured log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Optional log file.
    #[must_use]
    pub fn log_file(&self) -> Option<&Utf8PathBuf> {
        self.log_file.as_ref()
    }

    /// Delay applied before bootstrap.
    #[must_use]
    pub fn delayed_start(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.delayed_start)
    }

    /// Directory that owns first-run artefacts such as the credential file.
    ///
    /// Normally the process working directory; with `force_bin_dir` the
    /// directory containing the running executable.
    pub fn working_directory(&self) -> io::Result<PathBuf> {
        if !self.force_bin_dir {
            return std::env::current_dir();
        }
        let executable = std::env::current_exe()?;
        executable.parent().map(PathBuf::from).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "executable path did not have a parent directory",
            )
        })
    }

    /// Data directory resolved against the working directory.
    pub fn data_directory(&self) -> io::Result<PathBuf> {
        if self.data_dir.is_absolute() {
            return Ok(self.data_dir.as_std_path().to_path_buf());
        }
        Ok(self.working_directory()?.join(self.data_dir.as_std_path()))
    }
}
