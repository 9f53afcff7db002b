//! Backend trait for the record store.
//!
//! Defines the interface that every storage backend implements, enabling
//! the vault to run on a JSON file, PostgreSQL, or memory.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// An owner's entries, name to value.
pub type Entries = BTreeMap<String, String>;

/// Which backend a store is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Single JSON document on local disk.
    File,
    /// PostgreSQL table.
    Postgres,
    /// Non-persistent, in-process.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Postgres => f.write_str("postgres"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Backend trait for per-owner key-value storage.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// Names and values arrive already validated; owners are non-empty.
///
/// Errors returned here are internal. [`VaultStore`](super::VaultStore)
/// logs them and converts them into the contract's result shapes.
///
/// # Example
///
/// ```ignore
/// use vault::store::{VaultBackend, MemoryBackend};
///
/// let backend = MemoryBackend::new();
/// backend.set("1234", "token", "abc").await?;
/// let value = backend.get("1234", "token").await?;
/// ```
#[async_trait]
pub trait VaultBackend: Send + Sync + 'static {
    /// Identifies the backend for logging and status output.
    fn kind(&self) -> BackendKind;

    /// Inserts or replaces the value stored under (`owner`, `name`).
    ///
    /// Must be atomic from the caller's perspective: either the new value
    /// is visible to later reads, or the previous state is.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium cannot be written.
    async fn set(&self, owner: &str, name: &str, value: &str) -> Result<()>;

    /// Retrieves the value stored under (`owner`, `name`).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium cannot be read.
    async fn get(&self, owner: &str, name: &str) -> Result<Option<String>>;

    /// Retrieves every entry for `owner`. Empty if the owner has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium cannot be read.
    async fn get_all(&self, owner: &str) -> Result<Entries>;

    /// Removes (`owner`, `name`).
    ///
    /// Returns `Ok(true)` if an entry was removed, `Ok(false)` if nothing
    /// matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium cannot be written.
    async fn delete(&self, owner: &str, name: &str) -> Result<bool>;

    /// Number of entries stored for `owner`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium cannot be read.
    async fn count(&self, owner: &str) -> Result<usize>;
}
