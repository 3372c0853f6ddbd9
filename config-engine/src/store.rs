use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::validation::Validate;

/// Read/write access to one runtime-tunable configuration value.
///
/// Components receive an `Arc<dyn ConfigStore<T>>` at construction instead of
/// reaching for a process global, and read a fresh snapshot on every call so
/// updates take effect without a restart.
pub trait ConfigStore<T>: Send + Sync {
    /// Current value. Readers never observe a partially applied update.
    fn snapshot(&self) -> Arc<T>;

    /// Replace the value wholesale and return the new version.
    ///
    /// # Errors
    ///
    /// Rejects values that fail validation; the previous value stays live.
    fn update(&self, value: T) -> Result<u64>;

    /// Monotonic counter bumped by every successful update
    fn version(&self) -> u64;
}

/// Process-local store backed by a `parking_lot::RwLock`
pub struct InMemoryConfigStore<T> {
    current: RwLock<Arc<T>>,
    version: AtomicU64,
}

impl<T> InMemoryConfigStore<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            version: AtomicU64::new(0),
        }
    }
}

impl<T: Default> Default for InMemoryConfigStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> ConfigStore<T> for InMemoryConfigStore<T>
where
    T: Validate + Send + Sync,
{
    fn snapshot(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }

    fn update(&self, value: T) -> Result<u64> {
        value.validate()?;
        let mut guard = self.current.write();
        *guard = Arc::new(value);
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        drop(guard);
        tracing::info!(version, "Configuration updated");
        Ok(version)
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}
