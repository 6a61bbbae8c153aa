//! In-process serialization of read-then-transform sections.
//!
//! Callers that read device configuration and derive in-memory state from it
//! hold a [`ConfigMutex`] guard for that window only. Waiters are served in
//! arrival order. This protects process-local bookkeeping; the device's own
//! candidate lock is a separate thing (see [`Session::acquire_lock`]).
//!
//! [`Session::acquire_lock`]: crate::session::Session::acquire_lock

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Cloneable handle to one shared mutex.
#[derive(Debug, Clone, Default)]
pub struct ConfigMutex {
    inner: Arc<Mutex<()>>,
}

/// Held for the duration of a read + transform section.
#[derive(Debug)]
pub struct ConfigGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl ConfigMutex {
    /// Create a new mutex
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the mutex, first come first served
    pub async fn lock(&self) -> ConfigGuard<'_> {
        let guard = self.inner.lock().await;
        trace!("Config mutex acquired");
        ConfigGuard { _guard: guard }
    }

    /// Take the mutex only if it is free
    pub fn try_lock(&self) -> Option<ConfigGuard<'_>> {
        self.inner
            .try_lock()
            .ok()
            .map(|guard| ConfigGuard { _guard: guard })
    }

    /// Returns true if both handles share the same mutex
    pub fn same_as(&self, other: &ConfigMutex) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
