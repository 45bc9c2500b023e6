//! First-run administrator provisioning.
//!
//! The credential file's existence is the only idempotency guard: once it is
//! present no identity call is made, whatever the stored password is now.

mod identity;
mod password;

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use self::identity::{
    AdminRecord, FileIdentityProvider, FileIdentityStore, IdentityError, IdentityProvider,
    IdentityStore,
};
pub use self::password::{PASSWORD_LENGTH, generate_password};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

/// Name of the credential file written on first run.
pub const CREDENTIAL_FILE: &str = "password.txt";

const CREDENTIAL_MODE: u32 = 0o666;

/// Generated administrator login.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredential {
    /// Administrator login name.
    pub username: String,
    /// Generated plaintext password.
    pub password: String,
}

impl AdminCredential {
    fn render(&self) -> String {
        format!("username: {}\npassword: {}", self.username, self.password)
    }
}

impl fmt::Debug for AdminCredential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AdminCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of a provisioning attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A password was generated and the credential file written.
    Provisioned {
        /// The generated login.
        credential: AdminCredential,
        /// Path of the credential file.
        file: PathBuf,
    },
    /// The credential file already existed; nothing was done.
    AlreadyProvisioned {
        /// Path of the existing credential file.
        file: PathBuf,
    },
}

/// Errors raised during provisioning.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Checking for the credential file failed.
    #[error("failed to check credential file '{path}': {source}")]
    CheckCredentials {
        /// Credential file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The identity store rejected the lookup or password change.
    #[error("identity store error: {source}")]
    Identity {
        /// Store error.
        #[from]
        source: IdentityError,
    },
    /// The password changed but the credential file could not be written.
    #[error("failed to write credential file '{path}': {source}")]
    WriteCredentials {
        /// Credential file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Generates and records the administrator password exactly once per
/// directory.
#[derive(Debug)]
pub struct AdminProvisioner<S> {
    store: S,
    directory: PathBuf,
}

impl<S: IdentityStore> AdminProvisioner<S> {
    /// Builds a provisioner writing its credential file into `directory`.
    pub fn new(store: S, directory: impl Into<PathBuf>) -> Self {
        Self {
            store,
            directory: directory.into(),
        }
    }

    /// Path of the credential file.
    #[must_use]
    pub fn credential_path(&self) -> PathBuf {
        self.directory.join(CREDENTIAL_FILE)
    }

    /// Runs provisioning.
    ///
    /// Identity failures leave no credential file so the next start retries.
    /// A write failure after the password change is not rolled back.
    ///
    /// # Errors
    ///
    /// Returns a [`ProvisionError`] describing the failed step.
    pub fn provision(&self) -> Result<ProvisionOutcome, ProvisionError> {
        let file = self.credential_path();
        if credential_file_exists(&file)? {
            return Ok(ProvisionOutcome::AlreadyProvisioned { file });
        }

        let admin = self.store.admin()?;
        let credential = AdminCredential {
            username: admin.username.clone(),
            password: generate_password(),
        };
        self.store.set_password(&admin, &credential.password)?;
        write_credential_file(&file, &credential).map_err(|source| {
            ProvisionError::WriteCredentials {
                path: file.clone(),
                source,
            }
        })?;
        Ok(ProvisionOutcome::Provisioned { credential, file })
    }
}

fn credential_file_exists(path: &Path) -> Result<bool, ProvisionError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ProvisionError::CheckCredentials {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_credential_file(path: &Path, credential: &AdminCredential) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(CREDENTIAL_MODE);
    let mut file = options.open(path)?;
    file.write_all(credential.render().as_bytes())?;
    file.sync_all()?;
    // The process umask masks the creation mode.
    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(CREDENTIAL_MODE))?;
    Ok(())
}
