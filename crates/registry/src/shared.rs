//! Thread-shareable registry handle

use crate::clock::{Clock, SystemClock};
use crate::errors::Result;
use crate::registry::CertificateRegistry;
use certreg_storage::{MemoryStore, RegistryStore};
use certreg_types::{CertificateId, Verification};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// A registry behind a read/write lock
///
/// Queries share the read lock and run concurrently; commands take the write
/// lock, so they are applied one at a time. No lock outlives a call.
pub struct SharedRegistry<S: RegistryStore = MemoryStore, C: Clock = SystemClock> {
    inner: Arc<RwLock<CertificateRegistry<S, C>>>,
}

impl<S: RegistryStore, C: Clock> Clone for SharedRegistry<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RegistryStore, C: Clock> SharedRegistry<S, C> {
    pub fn new(registry: CertificateRegistry<S, C>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, CertificateRegistry<S, C>> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, CertificateRegistry<S, C>> {
        self.inner.write()
    }

    pub fn verify_certificate(&self, id: &CertificateId) -> Result<Verification> {
        self.read().verify_certificate(id)
    }
}
