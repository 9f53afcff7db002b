//! JSON-file vault backend.
//!
//! Holds the whole dataset in memory as a nested map of
//! owner → (name → value), and rewrites the document on every mutation:
//!
//! ```text
//! {
//!   "123456789": {
//!     "password": "secret123",
//!     "email": "me@example.com"
//!   }
//! }
//! ```
//!
//! Writes go to a temporary file in the target's directory which is then
//! renamed over the target, so a crash mid-write leaves the previous
//! document intact.

use super::backend::{BackendKind, Entries, VaultBackend};
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Persisted document layout.
type Document = BTreeMap<String, Entries>;

/// JSON-file backed vault storage.
///
/// Reads are served from the in-memory copy. Mutations are applied to a
/// copy of the document, persisted, and only then swapped in, so a failed
/// write leaves both memory and disk unchanged.
///
/// # Thread Safety
///
/// `JsonFileBackend` is `Clone`; clones share the same document. A mutex
/// serializes the modify-persist-swap sequence so concurrent writers never
/// lose each other's updates. Writers hold it across the fsync and rename,
/// so every operation, reads included, takes it on a blocking thread.
#[derive(Clone)]
pub struct JsonFileBackend {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl JsonFileBackend {
    /// Opens the document at `path`.
    ///
    /// A missing file starts an empty document; nothing is written until
    /// the first mutation. An unreadable or malformed file is logged and
    /// also treated as empty: its contents are lost on the next write.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let doc = match load_document(&path) {
            Ok(doc) => {
                tracing::debug!(path = %path.display(), owners = doc.len(), "Loaded vault document");
                doc
            },
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Vault document is unreadable, starting empty"
                );
                Document::new()
            },
        };

        Self {
            inner: Arc::new(Inner {
                path,
                doc: Mutex::new(doc),
            }),
        }
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Internal helper for synchronous get.
    fn get_sync(&self, owner: &str, name: &str) -> Option<String> {
        let doc = self.inner.doc.lock();
        doc.get(owner).and_then(|entries| entries.get(name).cloned())
    }

    /// Internal helper for synchronous get_all.
    fn get_all_sync(&self, owner: &str) -> Entries {
        let doc = self.inner.doc.lock();
        doc.get(owner).cloned().unwrap_or_default()
    }

    /// Internal helper for synchronous count.
    fn count_sync(&self, owner: &str) -> usize {
        let doc = self.inner.doc.lock();
        doc.get(owner).map_or(0, BTreeMap::len)
    }

    /// Internal helper for synchronous set.
    fn set_sync(&self, owner: &str, name: &str, value: &str) -> Result<()> {
        let mut doc = self.inner.doc.lock();

        let mut next = doc.clone();
        next.entry(owner.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());

        save_document(&self.inner.path, &next)?;
        *doc = next;
        Ok(())
    }

    /// Internal helper for synchronous delete.
    fn delete_sync(&self, owner: &str, name: &str) -> Result<bool> {
        let mut doc = self.inner.doc.lock();

        let exists = doc
            .get(owner)
            .is_some_and(|entries| entries.contains_key(name));
        if !exists {
            return Ok(false);
        }

        let mut next = doc.clone();
        if let Some(entries) = next.get_mut(owner) {
            entries.remove(name);
            if entries.is_empty() {
                next.remove(owner);
            }
        }

        save_document(&self.inner.path, &next)?;
        *doc = next;
        Ok(true)
    }
}

#[async_trait]
impl VaultBackend for JsonFileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    async fn set(&self, owner: &str, name: &str, value: &str) -> Result<()> {
        let backend = self.clone();
        let (owner, name, value) = (owner.to_string(), name.to_string(), value.to_string());
        tokio::task::spawn_blocking(move || backend.set_sync(&owner, &name, &value)).await?
    }

    async fn get(&self, owner: &str, name: &str) -> Result<Option<String>> {
        let backend = self.clone();
        let (owner, name) = (owner.to_string(), name.to_string());
        Ok(tokio::task::spawn_blocking(move || backend.get_sync(&owner, &name)).await?)
    }

    async fn get_all(&self, owner: &str) -> Result<Entries> {
        let backend = self.clone();
        let owner = owner.to_string();
        Ok(tokio::task::spawn_blocking(move || backend.get_all_sync(&owner)).await?)
    }

    async fn delete(&self, owner: &str, name: &str) -> Result<bool> {
        let backend = self.clone();
        let (owner, name) = (owner.to_string(), name.to_string());
        tokio::task::spawn_blocking(move || backend.delete_sync(&owner, &name)).await?
    }

    async fn count(&self, owner: &str) -> Result<usize> {
        let backend = self.clone();
        let owner = owner.to_string();
        Ok(tokio::task::spawn_blocking(move || backend.count_sync(&owner)).await?)
    }
}

/// Reads the document, treating a missing file as empty.
fn load_document(path: &Path) -> Result<Document> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::new()),
        Err(e) => return Err(StoreError::io(format!("reading {}", path.display()), e)),
    };
    Ok(serde_json::from_slice(&bytes)?)
}

/// Writes the document via a temporary file and atomic rename.
fn save_document(path: &Path, doc: &Document) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| StoreError::io(format!("creating {}", dir.display()), e))?;

    let json = serde_json::to_vec_pretty(doc)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| StoreError::io(format!("creating temp file in {}", dir.display()), e))?;
    tmp.write_all(&json)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StoreError::io(format!("writing {}", tmp.path().display()), e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::io(format!("replacing {}", path.display()), e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty_without_creating_it() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("user_data.json");
        let backend = JsonFileBackend::open(&path);

        assert_eq!(backend.count("u1").await.unwrap(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("user_data.json");
        fs::write(&path, "{not json").unwrap();

        let backend = JsonFileBackend::open(&path);
        assert!(backend.get_all("u1").await.unwrap().is_empty());

        // The next write replaces the corrupt document.
        backend.set("u1", "k", "v").await.unwrap();
        assert_eq!(read_json(&path), serde_json::json!({"u1": {"k": "v"}}));
    }

    #[tokio::test]
    async fn test_wrong_shape_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("user_data.json");
        fs::write(&path, r#"{"u1": {"k": 42}}"#).unwrap();

        let backend = JsonFileBackend::open(&path);
        assert_eq!(backend.count("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_loads_existing_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("user_data.json");
        fs::write(&path, r#"{"u1": {"password": "secret123", "email": "a@b.c"}}"#).unwrap();

        let backend = JsonFileBackend::open(&path);
        assert_eq!(backend.count("u1").await.unwrap(), 2);
        assert_eq!(
            backend.get("u1", "password").await.unwrap().as_deref(),
            Some("secret123")
        );
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("dir").join("user_data.json");

        let backend = JsonFileBackend::open(&path);
        backend.set("u1", "k", "v").await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_non_ascii_written_unescaped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("user_data.json");

        let backend = JsonFileBackend::open(&path);
        backend.set("u1", "memo", "日本語テキスト").await.unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("日本語テキスト"));
        assert!(raw.contains("\n  \"u1\""), "expected two-space indent: {raw}");
    }

    #[tokio::test]
    async fn test_delete_last_entry_removes_owner_on_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("user_data.json");

        let backend = JsonFileBackend::open(&path);
        backend.set("u1", "k", "v").await.unwrap();
        backend.set("u2", "k", "v").await.unwrap();
        assert!(backend.delete("u1", "k").await.unwrap());

        assert_eq!(read_json(&path), serde_json::json!({"u2": {"k": "v"}}));
    }

    #[tokio::test]
    async fn test_delete_missing_does_not_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("user_data.json");

        let backend = JsonFileBackend::open(&path);
        assert!(!backend.delete("u1", "k").await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let tmp = TempDir::new().unwrap();
        // A directory at the target path makes the final rename fail.
        let path = tmp.path().join("user_data.json");
        fs::create_dir(&path).unwrap();

        let backend = JsonFileBackend::open(&path);
        let result = backend.set("u1", "k", "v").await;

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(backend.get("u1", "k").await.unwrap(), None);
        assert_eq!(backend.count("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("user_data.json");

        let backend = JsonFileBackend::open(&path);
        for i in 0..5 {
            backend.set("u1", &format!("k{i}"), "v").await.unwrap();
        }
        backend.delete("u1", "k0").await.unwrap();

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("user_data.json")]);
    }

    #[tokio::test]
    async fn test_read_waits_off_the_runtime_while_locked() {
        let tmp = TempDir::new().unwrap();
        let backend = JsonFileBackend::open(tmp.path().join("user_data.json"));

        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let holder = backend.clone();
        let writer = std::thread::spawn(move || {
            let _guard = holder.inner.doc.lock();
            locked_tx.send(()).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(300));
        });
        locked_rx.recv().unwrap();

        // The runtime keeps ticking while the read waits for the lock.
        let mut read = Box::pin(backend.count("u1"));
        tokio::select! {
            biased;
            _ = &mut read => panic!("read completed while the document was locked"),
            () = tokio::time::sleep(std::time::Duration::from_millis(50)) => {},
        }

        assert_eq!(read.await.unwrap(), 0);
        writer.join().unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_writers_do_not_lose_updates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("user_data.json");
        let backend = JsonFileBackend::open(&path);

        let mut handles = Vec::new();
        for i in 0..20 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend.set("u1", &format!("k{i}"), "v").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(backend.count("u1").await.unwrap(), 20);
        let reopened = JsonFileBackend::open(&path);
        assert_eq!(reopened.count("u1").await.unwrap(), 20);
    }
}
