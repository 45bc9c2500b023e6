//! Identity store holding the administrator account.
//!
//! Provisioning only needs two capabilities: look up the administrator and
//! change its password. [`FileIdentityStore`] backs them with a JSON record
//! in the data directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::Builder;
use thiserror::Error;

use hearth_config::Config;

use super::password::random_string;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// File name of the administrator record inside the data directory.
pub const ADMIN_RECORD_FILE: &str = "admin.json";

const ADMIN_USERNAME: &str = "admin";
const ADMIN_ID: u64 = 1;
const SALT_LENGTH: usize = 16;
const INITIAL_SECRET_LENGTH: usize = 32;

/// The administrator account as seen by provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRecord {
    /// Stable account identifier.
    pub id: u64,
    /// Login name.
    pub username: String,
}

/// Errors raised by identity stores.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The data directory could not be created.
    #[error("failed to create data directory '{path}': {source}")]
    Directory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading the record failed.
    #[error("failed to read identity record '{path}': {source}")]
    Read {
        /// Record file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The record is not valid JSON.
    #[error("identity record '{path}' is malformed: {source}")]
    Decode {
        /// Record file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Serialising the record failed.
    #[error("failed to encode identity record: {source}")]
    Encode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Writing the record failed.
    #[error("failed to write identity record '{path}': {source}")]
    Write {
        /// Record file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The record passed in is not the stored administrator.
    #[error("unknown administrator account {id}")]
    UnknownAdmin {
        /// Identifier of the rejected record.
        id: u64,
    },
    /// Resolving the data directory failed.
    #[error("failed to resolve data directory: {source}")]
    DataDirectory {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Capability consumed by first-run provisioning.
pub trait IdentityStore: Send + Sync {
    /// Fetches the administrator account. The account must already exist.
    fn admin(&self) -> Result<AdminRecord, IdentityError>;

    /// Replaces the administrator password.
    fn set_password(&self, admin: &AdminRecord, password: &str) -> Result<(), IdentityError>;
}

impl<T> IdentityStore for Arc<T>
where
    T: IdentityStore + ?Sized,
{
    fn admin(&self) -> Result<AdminRecord, IdentityError> {
        (**self).admin()
    }

    fn set_password(&self, admin: &AdminRecord, password: &str) -> Result<(), IdentityError> {
        (**self).set_password(admin, password)
    }
}

/// Opens the identity store for a configuration snapshot.
pub trait IdentityProvider: Send + Sync {
    /// Opens or creates the store.
    fn open(&self, config: &Config) -> Result<Arc<dyn IdentityStore>, IdentityError>;
}

/// Provider backed by [`FileIdentityStore`] in the configured data directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileIdentityProvider;

impl IdentityProvider for FileIdentityProvider {
    fn open(&self, config: &Config) -> Result<Arc<dyn IdentityStore>, IdentityError> {
        let directory = config
            .data_directory()
            .map_err(|source| IdentityError::DataDirectory { source })?;
        Ok(Arc::new(FileIdentityStore::open(directory)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAdmin {
    id: u64,
    username: String,
    salt: String,
    password_hash: String,
}

impl StoredAdmin {
    fn with_password(id: u64, username: String, password: &str) -> Self {
        let salt = random_string(SALT_LENGTH);
        let password_hash = hash_password(&salt, password);
        Self {
            id,
            username,
            salt,
            password_hash,
        }
    }

    fn record(&self) -> AdminRecord {
        AdminRecord {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// Identity store persisting the administrator in `<data_dir>/admin.json`.
///
/// Opening a fresh data directory creates the `admin` account with an
/// unguessable password; provisioning replaces it. Passwords are stored as
/// salted SHA-256 digests.
#[derive(Debug)]
pub struct FileIdentityStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileIdentityStore {
    /// Opens the store, creating the directory and account when missing.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] when the directory or record cannot be
    /// created, or the existing record cannot be read.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self, IdentityError> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory).map_err(|source| IdentityError::Directory {
            path: directory.to_path_buf(),
            source,
        })?;
        let store = Self {
            path: directory.join(ADMIN_RECORD_FILE),
            guard: Mutex::new(()),
        };
        match fs::metadata(&store.path) {
            Ok(_) => {
                store.read()?;
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                let secret = random_string(INITIAL_SECRET_LENGTH);
                store.write(&StoredAdmin::with_password(
                    ADMIN_ID,
                    ADMIN_USERNAME.to_owned(),
                    &secret,
                ))?;
            }
            Err(source) => {
                return Err(IdentityError::Read {
                    path: store.path.clone(),
                    source,
                });
            }
        }
        Ok(store)
    }

    /// Path of the backing record.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks `password` against the stored digest.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] when the record cannot be read.
    pub fn verify_password(&self, password: &str) -> Result<bool, IdentityError> {
        let stored = self.read()?;
        Ok(hash_password(&stored.salt, password) == stored.password_hash)
    }

    fn read(&self) -> Result<StoredAdmin, IdentityError> {
        let bytes = fs::read(&self.path).map_err(|source| IdentityError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| IdentityError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, stored: &StoredAdmin) -> Result<(), IdentityError> {
        let payload =
            serde_json::to_vec_pretty(stored).map_err(|source| IdentityError::Encode { source })?;
        atomic_write(&self.path, &payload).map_err(|source| IdentityError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl IdentityStore for FileIdentityStore {
    fn admin(&self) -> Result<AdminRecord, IdentityError> {
        Ok(self.read()?.record())
    }

    fn set_password(&self, admin: &AdminRecord, password: &str) -> Result<(), IdentityError> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = self.read()?;
        if stored.id != admin.id {
            return Err(IdentityError::UnknownAdmin { id: admin.id });
        }
        self.write(&StoredAdmin::with_password(
            stored.id,
            stored.username,
            password,
        ))
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    hex::encode(digest)
}

/// Writes the bytes through a synced temporary file renamed into place.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "target path did not have a parent directory",
        )
    })?;

    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(ADMIN_RECORD_FILE),
    );
    #[cfg(unix)]
    builder.permissions(fs::Permissions::from_mode(0o600));

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
