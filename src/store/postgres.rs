//! PostgreSQL vault backend.
//!
//! Stores one row per (owner, name) in the `user_data` table. Each
//! operation checks a connection out of an r2d2 pool on a blocking thread,
//! runs its statement(s), and returns the connection when the guard drops,
//! on success and on every error path alike.

use super::backend::{BackendKind, Entries, VaultBackend};
use crate::config::PostgresConfig;
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use postgres::{Client, NoTls};
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;

type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Idempotent schema applied by [`PostgresBackend::initialize_schema`].
pub const SCHEMA: &str = include_str!("schema.sql");

const UPSERT: &str = "INSERT INTO user_data (user_id, key, value) VALUES ($1, $2, $3) \
                      ON CONFLICT (user_id, key) DO UPDATE SET value = EXCLUDED.value, \
                      updated_at = CURRENT_TIMESTAMP";
const SELECT_ONE: &str = "SELECT value FROM user_data WHERE user_id = $1 AND key = $2";
const SELECT_ALL: &str = "SELECT key, value FROM user_data WHERE user_id = $1 ORDER BY key";
const DELETE: &str = "DELETE FROM user_data WHERE user_id = $1 AND key = $2";
const COUNT: &str = "SELECT COUNT(*) FROM user_data WHERE user_id = $1";

/// PostgreSQL-backed vault storage.
///
/// Construction only validates parameters and prepares the pool; no
/// connection is made until [`check_connection`](Self::check_connection)
/// or the first operation.
///
/// # Thread Safety
///
/// Every call uses its own pooled connection and, for mutations, its own
/// transaction. The database provides atomicity; no client-side locking.
pub struct PostgresBackend {
    pool: Option<PgPool>,
}

impl Drop for PostgresBackend {
    fn drop(&mut self) {
        // The sync client owns a runtime that panics if dropped on an
        // async worker thread.
        if let Some(pool) = self.pool.take() {
            let _ = std::thread::spawn(move || drop(pool));
        }
    }
}

impl PostgresBackend {
    /// Creates a backend for the given connection parameters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if host, database, user or password
    /// is empty, or the pool size or connect timeout is zero.
    pub fn new(config: &PostgresConfig) -> Result<Self> {
        config.validate()?;

        let manager = PostgresConnectionManager::new(config.to_pg_config(), NoTls);
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .min_idle(Some(0))
            .connection_timeout(config.connect_timeout())
            .build_unchecked(manager);

        tracing::debug!(
            host = %config.host,
            port = config.port,
            dbname = %config.dbname,
            "Prepared PostgreSQL pool"
        );

        Ok(Self { pool: Some(pool) })
    }

    /// Runs `SELECT 1` and returns true if the server answered with 1.
    ///
    /// Failures are logged, never returned.
    pub async fn check_connection(&self) -> bool {
        let result = self
            .run(|client| {
                let row = client.query_one("SELECT 1", &[])?;
                Ok(row.get::<_, i32>(0) == 1)
            })
            .await;

        match result {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(error = %e, "PostgreSQL connection test failed");
                false
            },
        }
    }

    /// Creates the table and index if they do not exist.
    ///
    /// Safe to run against a database that already has the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be made or a statement fails.
    pub async fn initialize_schema(&self) -> Result<()> {
        self.run(|client| Ok(client.batch_execute(SCHEMA)?)).await?;
        tracing::info!("PostgreSQL schema initialized");
        Ok(())
    }

    /// Runs `op` with a pooled connection on a blocking thread.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Client) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone().ok_or(StoreError::Closed)?;
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            op(&mut *conn)
        })
        .await?
    }
}

#[async_trait]
impl VaultBackend for PostgresBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn set(&self, owner: &str, name: &str, value: &str) -> Result<()> {
        let (owner, name, value) = (owner.to_string(), name.to_string(), value.to_string());
        self.run(move |client| {
            let mut tx = client.transaction()?;
            tx.execute(UPSERT, &[&owner, &name, &value])?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get(&self, owner: &str, name: &str) -> Result<Option<String>> {
        let (owner, name) = (owner.to_string(), name.to_string());
        self.run(move |client| {
            let row = client.query_opt(SELECT_ONE, &[&owner, &name])?;
            Ok(row.map(|row| row.get(0)))
        })
        .await
    }

    async fn get_all(&self, owner: &str) -> Result<Entries> {
        let owner = owner.to_string();
        self.run(move |client| {
            let rows = client.query(SELECT_ALL, &[&owner])?;
            Ok(rows
                .iter()
                .map(|row| (row.get(0), row.get(1)))
                .collect())
        })
        .await
    }

    async fn delete(&self, owner: &str, name: &str) -> Result<bool> {
        let (owner, name) = (owner.to_string(), name.to_string());
        self.run(move |client| {
            let mut tx = client.transaction()?;
            let affected = tx.execute(DELETE, &[&owner, &name])?;
            tx.commit()?;
            Ok(affected > 0)
        })
        .await
    }

    async fn count(&self, owner: &str) -> Result<usize> {
        let owner = owner.to_string();
        self.run(move |client| {
            let count: i64 = client.query_one(COUNT, &[&owner])?.get(0);
            Ok(usize::try_from(count).unwrap_or_default())
        })
        .await
    }
}
