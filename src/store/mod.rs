//! Per-owner record store with pluggable backends.
//!
//! Every owner holds a small namespace of named text values. Three
//! backends implement the same contract:
//!
//! - **JsonFileBackend**: Single JSON document on disk (default)
//! - **PostgresBackend**: `user_data` table, used when configured and reachable
//! - **MemoryBackend**: Fast, non-persistent storage (testing/embedding)
//!
//! # Example
//!
//! ```ignore
//! use vault::store::{VaultStore, select_backend};
//! use vault::config::VaultConfig;
//!
//! // In-memory (testing/embedding)
//! let store = VaultStore::memory();
//! store.set("1234", "token", "abc").await;
//!
//! // Whatever the environment allows (production)
//! let selection = select_backend(&VaultConfig::from_env()).await;
//! let store = selection.store;
//! ```
//!
//! # Custom Backends
//!
//! Implement the `VaultBackend` trait to use custom storage:
//!
//! ```ignore
//! use vault::store::{VaultBackend, VaultStore};
//!
//! struct RedisBackend { /* ... */ }
//! impl VaultBackend for RedisBackend { /* ... */ }
//!
//! let store = VaultStore::custom(RedisBackend::new());
//! ```

mod backend;
mod file;
mod memory;
mod postgres;
mod selector;
mod store;


// Re-export the public API
pub use backend::{BackendKind, Entries, VaultBackend};
pub use file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use postgres::{PostgresBackend, SCHEMA};
pub use selector::{Selection, select_backend};
pub use store::VaultStore;
