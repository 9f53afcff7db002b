//! High-level `VaultStore` wrapper over backend implementations.
//!
//! This is the record store contract seen by command handlers. Backend
//! errors stop here: they are logged and turned into `false`, `None`, or
//! `0`, so callers only ever see the contract's result shapes.

use super::backend::{BackendKind, Entries, VaultBackend};
use super::file::JsonFileBackend;
use super::memory::MemoryBackend;
use std::path::Path;
use std::sync::Arc;

/// Per-owner record store.
///
/// Wraps a `VaultBackend` and provides a consistent API regardless of the
/// underlying storage mechanism.
///
/// # Thread Safety
///
/// `VaultStore` is `Clone` and can be shared across tasks. The underlying
/// backend handles concurrent access safely.
///
/// # Example
///
/// ```ignore
/// use vault::store::VaultStore;
///
/// let store = VaultStore::memory();
/// assert!(store.set("1234", "token", "abc").await);
/// assert_eq!(store.get("1234", "token").await.as_deref(), Some("abc"));
/// ```
#[derive(Clone)]
pub struct VaultStore {
    backend: Arc<dyn VaultBackend>,
}

impl VaultStore {
    /// Creates a store backed by the JSON document at `path`.
    ///
    /// Never fails: a missing file starts empty, an unreadable one is
    /// logged and also starts empty.
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        Self::custom(JsonFileBackend::open(path))
    }

    /// Creates a store backed by memory. All data is lost on exit.
    pub fn memory() -> Self {
        Self::custom(MemoryBackend::new())
    }

    /// Creates a store with a custom backend.
    pub fn custom<B: VaultBackend>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Creates a store from a boxed backend.
    pub fn from_boxed(backend: Box<dyn VaultBackend>) -> Self {
        Self {
            backend: Arc::from(backend),
        }
    }

    /// The backend this store is bound to.
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Inserts or replaces a value. Returns `false` if it could not be
    /// persisted.
    pub async fn set(&self, owner: &str, name: &str, value: &str) -> bool {
        if owner.is_empty() {
            tracing::warn!(name, "Rejected write with empty owner");
            return false;
        }
        match self.backend.set(owner, name, value).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(backend = %self.kind(), owner, name, error = %e, "Failed to store entry");
                false
            },
        }
    }

    /// Returns the stored value, or `None` if there is none.
    ///
    /// A read failure is logged and also reported as `None`.
    pub async fn get(&self, owner: &str, name: &str) -> Option<String> {
        if owner.is_empty() {
            return None;
        }
        match self.backend.get(owner, name).await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(backend = %self.kind(), owner, name, error = %e, "Failed to read entry");
                None
            },
        }
    }

    /// Returns every entry for `owner`, or `None` if the owner has none.
    ///
    /// `None` and an empty map are deliberately not interchangeable:
    /// callers render "no data" on `None`.
    pub async fn get_all(&self, owner: &str) -> Option<Entries> {
        if owner.is_empty() {
            return None;
        }
        match self.backend.get_all(owner).await {
            Ok(entries) if entries.is_empty() => None,
            Ok(entries) => Some(entries),
            Err(e) => {
                tracing::error!(backend = %self.kind(), owner, error = %e, "Failed to read entries");
                None
            },
        }
    }

    /// Removes an entry. Returns `true` only if something was removed.
    pub async fn delete(&self, owner: &str, name: &str) -> bool {
        if owner.is_empty() {
            return false;
        }
        match self.backend.delete(owner, name).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!(backend = %self.kind(), owner, name, error = %e, "Failed to delete entry");
                false
            },
        }
    }

    /// Number of entries stored for `owner`. `0` on read failure.
    pub async fn count(&self, owner: &str) -> usize {
        if owner.is_empty() {
            return 0;
        }
        match self.backend.count(owner).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(backend = %self.kind(), owner, error = %e, "Failed to count entries");
                0
            },
        }
    }
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("backend", &self.kind())
            .finish()
    }
}
