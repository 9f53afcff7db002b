//! End-to-end tests through the public API: configuration, backend
//! selection, command handling, and migration.
//!
//! Run with:
//! ```bash
//! cargo test --test vault_store
//! ```
//!
//! No PostgreSQL server is needed; relational configuration here always
//! falls back to the JSON file.

use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;
use vault::commands::{CommandHandler, ReplyStatus};
use vault::config::{RelationalConfig, VaultConfig};
use vault::migrate::{migrate_json, verify_migration};
use vault::store::{BackendKind, VaultStore, select_backend};

fn config_for(data_file: &Path, vars: &[(&str, &str)]) -> VaultConfig {
    let mut env: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    env.insert(
        "VAULT_DATA_FILE".to_string(),
        data_file.display().to_string(),
    );
    VaultConfig::from_lookup(move |key: &str| env.get(key).cloned())
}

#[tokio::test]
async fn test_session_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("user_data.json");
    let config = config_for(&path, &[]);
    assert!(matches!(config.postgres, RelationalConfig::Absent));

    {
        let selection = select_backend(&config).await;
        assert_eq!(selection.kind, BackendKind::File);

        let handler = CommandHandler::new(selection.store);
        assert!(handler.save("123456789", "password", "secret123").await.is_success());
        assert!(handler.save("123456789", "memo", "日本語テキスト").await.is_success());
        assert!(handler.save("987654321", "password", "other").await.is_success());
    }

    let handler = CommandHandler::new(select_backend(&config).await.store);
    let reply = handler.get("123456789", Some("memo")).await;
    assert_eq!(reply.status, ReplyStatus::Success);
    assert!(reply.text.contains("日本語テキスト"));

    let reply = handler.list("123456789").await;
    assert!(reply.text.ends_with("Total: 2 / Limit: 100"));

    let reply = handler.get("987654321", Some("memo")).await;
    assert_eq!(reply.status, ReplyStatus::NotFound);
}

#[tokio::test]
async fn test_unreachable_postgres_falls_back_to_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("user_data.json");
    let config = config_for(
        &path,
        &[
            ("PGHOST", "127.0.0.1"),
            ("PGPORT", "1"),
            ("PGDATABASE", "vault"),
            ("PGUSER", "vault"),
            ("PGPASSWORD", "secret"),
            ("VAULT_PG_CONNECT_TIMEOUT_MS", "300"),
            ("VAULT_PG_MAX_CONNECTIONS", "1"),
        ],
    );
    assert!(matches!(config.postgres, RelationalConfig::Ready(_)));

    let selection = select_backend(&config).await;
    assert_eq!(selection.kind, BackendKind::File);
    assert!(selection.fallback_reason.is_some());

    assert!(selection.store.set("u1", "k", "v").await);
    assert!(path.exists());
}

#[tokio::test]
async fn test_invalid_port_falls_back_to_file() {
    let tmp = TempDir::new().unwrap();
    let config = config_for(
        &tmp.path().join("user_data.json"),
        &[
            ("PGHOST", "localhost"),
            ("PGPORT", "not-a-port"),
            ("PGDATABASE", "vault"),
            ("PGUSER", "vault"),
            ("PGPASSWORD", "secret"),
        ],
    );

    let selection = select_backend(&config).await;
    assert_eq!(selection.kind, BackendKind::File);
    assert!(selection.fallback_reason.unwrap().contains("PGPORT"));
}

#[tokio::test]
async fn test_file_document_migrates_into_another_store() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("user_data.json");

    let source = VaultStore::file(&path);
    for i in 0..10 {
        assert!(source.set("u1", &format!("key{i}"), &format!("value {i}")).await);
    }
    assert!(source.set("u2", "token", "🔑").await);

    let target = VaultStore::memory();
    let report = migrate_json(&path, &target).await.unwrap();
    assert_eq!(report.total, 11);
    assert_eq!(report.migrated, 11);
    assert!(tmp.path().join("user_data.json.backup").exists());

    assert_eq!(target.get_all("u1").await, source.get_all("u1").await);
    assert!(verify_migration(&path, &target).await.unwrap().passed());
}
