//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use hearth_config::{Config, DISABLED_PORT};

use crate::bootstrap::ConfigLoader;

/// Reserves a free loopback port and releases it for the caller to bind.
#[must_use]
pub fn reserve_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind reserved port");
    listener.local_addr().expect("local addr").port()
}

/// Loader serving a configuration rooted in a temporary directory.
///
/// Defaults to a single loopback HTTP listener on an ephemeral port. Clones
/// share the directory, which lives until the last clone is dropped.
#[derive(Clone)]
pub struct TestConfigLoader {
    dir: Arc<TempDir>,
    config: Config,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory");
        let root = utf8(dir.path());
        let config = Config {
            address: String::from("127.0.0.1"),
            http_port: 0,
            https_port: DISABLED_PORT,
            data_dir: root.join("data"),
            ..Config::default()
        };
        Self {
            dir: Arc::new(dir),
            config,
        }
    }

    /// Working directory used for first-run artefacts.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Socket path inside the temporary directory.
    #[must_use]
    pub fn socket_path(&self) -> Utf8PathBuf {
        utf8(self.dir.path()).join("hearth.sock")
    }

    #[must_use]
    pub fn with_http_port(mut self, port: i32) -> Self {
        self.config.http_port = port;
        self
    }

    /// Enables HTTPS with certificate paths that do not exist.
    #[must_use]
    pub fn with_unreadable_tls(mut self, port: i32) -> Self {
        let root = utf8(self.dir.path());
        self.config.https_port = port;
        self.config.cert_file = root.join("missing.crt");
        self.config.key_file = root.join("missing.key");
        self
    }

    #[must_use]
    pub fn with_unix_socket(mut self, permissions: &str) -> Self {
        self.config.unix_file = self.socket_path();
        self.config.unix_file_perm = permissions.to_owned();
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Default for TestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("hearthd"),
            OsString::from("--http-port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}

fn utf8(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("temporary path was not valid UTF-8")
}
