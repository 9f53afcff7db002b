//! Startup backend selection.
//!
//! Runs once per process: try PostgreSQL if it is configured, fall back to
//! the JSON file on any failure along the way. The chosen store is bound
//! for the rest of the process lifetime.

use super::backend::BackendKind;
use super::postgres::PostgresBackend;
use super::store::VaultStore;
use crate::config::{PostgresConfig, RelationalConfig, VaultConfig};

/// Outcome of [`select_backend`].
#[derive(Debug, Clone)]
pub struct Selection {
    /// The bound store.
    pub store: VaultStore,
    /// Which backend `store` uses.
    pub kind: BackendKind,
    /// Why PostgreSQL was configured but not used.
    pub fallback_reason: Option<String>,
}

/// Picks the backend for this process.
///
/// Never fails. Relational construction, connectivity, and schema errors
/// all degrade to the file backend with a warning.
pub async fn select_backend(config: &VaultConfig) -> Selection {
    let fallback_reason = match &config.postgres {
        RelationalConfig::Absent => {
            tracing::info!("PostgreSQL not configured, using JSON file storage");
            None
        },
        RelationalConfig::Invalid(e) => {
            tracing::warn!(error = %e, "PostgreSQL configuration invalid, falling back to JSON file");
            Some(format!("invalid configuration: {e}"))
        },
        RelationalConfig::Ready(pg) => match connect(pg).await {
            Ok(backend) => {
                let store = VaultStore::custom(backend);
                tracing::info!(backend = %store.kind(), host = %pg.host, "Storage backend selected");
                return Selection {
                    kind: store.kind(),
                    store,
                    fallback_reason: None,
                };
            },
            Err(reason) => {
                tracing::warn!(%reason, "PostgreSQL unavailable, falling back to JSON file");
                Some(reason)
            },
        },
    };

    let store = VaultStore::file(&config.data_file);
    tracing::info!(
        backend = %store.kind(),
        path = %config.data_file.display(),
        "Storage backend selected"
    );
    Selection {
        kind: store.kind(),
        store,
        fallback_reason,
    }
}

/// Constructs, tests, and initializes the relational backend.
async fn connect(config: &PostgresConfig) -> Result<PostgresBackend, String> {
    let backend =
        PostgresBackend::new(config).map_err(|e| format!("construction failed: {e}"))?;

    if !backend.check_connection().await {
        return Err("connection test failed".to_string());
    }

    backend
        .initialize_schema()
        .await
        .map_err(|e| format!("schema initialization failed: {e}"))?;

    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use tempfile::TempDir;

    fn config_with(dir: &TempDir, postgres: RelationalConfig) -> VaultConfig {
        VaultConfig {
            data_file: dir.path().join("user_data.json"),
            postgres,
        }
    }

    #[tokio::test]
    async fn test_absent_config_selects_file() {
        let tmp = TempDir::new().unwrap();
        let selection = select_backend(&config_with(&tmp, RelationalConfig::Absent)).await;

        assert_eq!(selection.kind, BackendKind::File);
        assert_eq!(selection.store.kind(), BackendKind::File);
        assert!(selection.fallback_reason.is_none());
    }

    #[tokio::test]
    async fn test_invalid_config_falls_back_to_file() {
        let tmp = TempDir::new().unwrap();
        let invalid = RelationalConfig::Invalid(ConfigError::Invalid {
            var: "PGPORT",
            reason: "invalid digit found in string".to_string(),
        });
        let selection = select_backend(&config_with(&tmp, invalid)).await;

        assert_eq!(selection.kind, BackendKind::File);
        let reason = selection.fallback_reason.unwrap();
        assert!(reason.contains("PGPORT"), "{reason}");
    }

    #[tokio::test]
    async fn test_blank_parameter_falls_back_to_file() {
        let tmp = TempDir::new().unwrap();
        let pg = PostgresConfig::new("localhost", "vault", "", "secret");
        let selection = select_backend(&config_with(&tmp, RelationalConfig::Ready(pg))).await;

        assert_eq!(selection.kind, BackendKind::File);
        let reason = selection.fallback_reason.unwrap();
        assert!(reason.starts_with("construction failed"), "{reason}");
    }

    #[tokio::test]
    async fn test_zero_connect_timeout_falls_back_to_file() {
        let tmp = TempDir::new().unwrap();
        let config = VaultConfig::from_lookup(|key: &str| {
            match key {
                "PGHOST" => Some("127.0.0.1"),
                "PGDATABASE" | "PGUSER" => Some("vault"),
                "PGPASSWORD" => Some("secret"),
                "VAULT_PG_CONNECT_TIMEOUT_MS" => Some("0"),
                _ => None,
            }
            .map(str::to_string)
        });
        assert!(matches!(config.postgres, RelationalConfig::Ready(_)));

        let config = VaultConfig {
            data_file: tmp.path().join("user_data.json"),
            ..config
        };
        let selection = select_backend(&config).await;

        assert_eq!(selection.kind, BackendKind::File);
        let reason = selection.fallback_reason.unwrap();
        assert!(reason.starts_with("construction failed"), "{reason}");
        assert!(reason.contains("VAULT_PG_CONNECT_TIMEOUT_MS"), "{reason}");
    }

    #[tokio::test]
    async fn test_unreachable_server_falls_back_to_file() {
        let tmp = TempDir::new().unwrap();
        let mut pg = PostgresConfig::new("127.0.0.1", "vault", "vault", "secret");
        pg.port = 1;
        pg.max_connections = 1;
        pg.connect_timeout_ms = 300;

        let selection = select_backend(&config_with(&tmp, RelationalConfig::Ready(pg))).await;

        assert_eq!(selection.kind, BackendKind::File);
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("connection test failed")
        );

        // The fallback store is usable and writes to the configured path.
        assert!(selection.store.set("u1", "k", "v").await);
        assert!(tmp.path().join("user_data.json").exists());
    }
}
