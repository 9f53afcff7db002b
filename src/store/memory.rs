//! In-memory vault backend.
//!
//! Entries live in a DashMap keyed by owner and vanish with the process.
//! Suited to tests and to embedding the vault in another process.

use super::backend::{BackendKind, Entries, VaultBackend};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory backend keyed by owner.
///
/// Owners with no entries are removed, mirroring the file backend's
/// sparse document.
///
/// # Thread Safety
///
/// Each owner's map sits behind a DashMap shard lock, so a write to one
/// owner never blocks another.
#[derive(Default)]
pub struct MemoryBackend {
    owners: DashMap<String, Entries>,
}

impl MemoryBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of owners holding at least one entry.
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }
}

#[async_trait]
impl VaultBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn set(&self, owner: &str, name: &str, value: &str) -> Result<()> {
        self.owners
            .entry(owner.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, owner: &str, name: &str) -> Result<Option<String>> {
        Ok(self
            .owners
            .get(owner)
            .and_then(|entries| entries.get(name).cloned()))
    }

    async fn get_all(&self, owner: &str) -> Result<Entries> {
        Ok(self
            .owners
            .get(owner)
            .map(|entries| entries.value().clone())
            .unwrap_or_default())
    }

    async fn delete(&self, owner: &str, name: &str) -> Result<bool> {
        let removed = match self.owners.get_mut(owner) {
            Some(mut entries) => entries.remove(name).is_some(),
            None => return Ok(false),
        };
        // Shard guard is released above; drop the owner if now empty.
        self.owners.remove_if(owner, |_, entries| entries.is_empty());
        Ok(removed)
    }

    async fn count(&self, owner: &str) -> Result<usize> {
        Ok(self.owners.get(owner).map_or(0, |entries| entries.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set() {
        let backend = MemoryBackend::new();

        backend.set("u1", "key1", "value1").await.unwrap();
        let value = backend.get("u1", "key1").await.unwrap();
        assert_eq!(value.as_deref(), Some("value1"));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("u1", "missing").await.unwrap(), None);
        assert!(backend.get_all("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_empty_owner() {
        let backend = MemoryBackend::new();

        backend.set("u1", "key1", "value1").await.unwrap();
        assert_eq!(backend.owner_count(), 1);

        assert!(backend.delete("u1", "key1").await.unwrap());
        assert_eq!(backend.owner_count(), 0);
        assert_eq!(backend.get("u1", "key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_nonexistent() {
        let backend = MemoryBackend::new();
        backend.set("u1", "keep", "v").await.unwrap();

        assert!(!backend.delete("u1", "missing").await.unwrap());
        assert!(!backend.delete("u2", "keep").await.unwrap());
        assert_eq!(backend.count("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let backend = MemoryBackend::new();

        backend.set("u1", "key", "value1").await.unwrap();
        backend.set("u1", "key", "value2").await.unwrap();

        assert_eq!(backend.get("u1", "key").await.unwrap().as_deref(), Some("value2"));
        assert_eq!(backend.count("u1").await.unwrap(), 1);
    }
}
