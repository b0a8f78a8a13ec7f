//! Lock-free snapshot hand-off from a consumer to its readers.
//!
//! The owning consumer builds a fresh immutable value and [`store`]s it; any
//! number of readers [`load`] the latest one as an `Arc<T>`. Readers never see
//! live mutable state and never block the writer.
//!
//! [`store`]: SnapshotCell::store
//! [`load`]: SnapshotCell::load

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

/// Shared handle to the most recently published `T`.
///
/// Cloning yields another handle to the same cell.
pub struct SnapshotCell<T> {
    inner: Arc<ArcSwap<T>>,
}

impl<T> SnapshotCell<T> {
    /// Creates a cell holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Returns the latest published value.
    pub fn load(&self) -> Arc<T> {
        self.inner.load_full()
    }

    /// Publishes a new value, replacing the previous one.
    pub fn store(&self, value: T) {
        self.inner.store(Arc::new(value));
    }
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Clone for SnapshotCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SnapshotCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SnapshotCell").field(&self.load()).finish()
    }
}
