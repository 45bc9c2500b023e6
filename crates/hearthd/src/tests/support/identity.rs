//! Identity providers that count password updates or fail on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hearth_config::Config;

use crate::admin::{
    AdminRecord, FileIdentityProvider, IdentityError, IdentityProvider, IdentityStore,
};

/// Wraps [`FileIdentityProvider`] and counts `set_password` calls.
#[derive(Debug, Clone, Default)]
pub struct CountingIdentityProvider {
    updates: Arc<AtomicUsize>,
}

impl CountingIdentityProvider {
    #[must_use]
    pub fn password_updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for CountingIdentityProvider {
    fn open(&self, config: &Config) -> Result<Arc<dyn IdentityStore>, IdentityError> {
        Ok(Arc::new(CountingStore {
            inner: FileIdentityProvider.open(config)?,
            updates: Arc::clone(&self.updates),
        }))
    }
}

struct CountingStore {
    inner: Arc<dyn IdentityStore>,
    updates: Arc<AtomicUsize>,
}

impl IdentityStore for CountingStore {
    fn admin(&self) -> Result<AdminRecord, IdentityError> {
        self.inner.admin()
    }

    fn set_password(&self, admin: &AdminRecord, password: &str) -> Result<(), IdentityError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.set_password(admin, password)
    }
}

/// Provider whose store cannot be opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingIdentityProvider;

impl IdentityProvider for FailingIdentityProvider {
    fn open(&self, _config: &Config) -> Result<Arc<dyn IdentityStore>, IdentityError> {
        Err(IdentityError::UnknownAdmin { id: 1 })
    }
}
