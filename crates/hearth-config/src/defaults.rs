//! Built-in defaults shared by the configuration layers.

use camino::Utf8PathBuf;

/// Sentinel port value that disables a TCP transport.
pub const DISABLED_PORT: i32 = -1;

/// Default bind address for the TCP transports.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default plaintext HTTP port.
pub const DEFAULT_HTTP_PORT: i32 = 5244;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log filter applied when debug mode is requested.
pub const DEBUG_LOG_FILTER: &str = "debug";

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Owned bind address used where allocation is required (e.g. serde).
pub fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

/// Plaintext HTTP port used when nothing else is configured.
pub fn default_http_port() -> i32 {
    DEFAULT_HTTP_PORT
}

/// TLS stays disabled until an operator supplies a port.
pub fn default_https_port() -> i32 {
    DISABLED_PORT
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default data directory.
pub fn default_data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_DATA_DIR)
}
