//! One-shot migration from the JSON document into another store.
//!
//! [`migrate_json`] copies every entry into the target and backs up the
//! source; [`verify_migration`] re-reads both sides and reports any entry
//! that did not arrive intact.

use crate::store::VaultStore;
use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of [`migrate_json`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Entries found in the source.
    pub total: usize,
    /// Entries the target accepted.
    pub migrated: usize,
    /// `(owner, name)` pairs the target refused.
    pub failed: Vec<(String, String)>,
    /// Owners skipped because their value was not an object.
    pub skipped_owners: Vec<String>,
    /// Copy of the source, if one was made.
    pub backup: Option<PathBuf>,
}

/// A single verification failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    MissingOwner {
        owner: String,
    },
    MissingName {
        owner: String,
        name: String,
    },
    ValueDiffers {
        owner: String,
        name: String,
        expected: String,
        actual: String,
    },
}

/// Result of [`verify_migration`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Entries compared.
    pub checked: usize,
    pub mismatches: Vec<Mismatch>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Copies every entry of the JSON document at `path` into `target`.
///
/// A missing file is not an error: it logs a warning and returns an empty
/// report. Non-string values are stored as their JSON text.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or is not a JSON
/// object.
pub async fn migrate_json(path: &Path, target: &VaultStore) -> Result<MigrationReport> {
    let Some(document) = load_source(path)? else {
        tracing::warn!(path = %path.display(), "JSON file not found, nothing to migrate");
        return Ok(MigrationReport::default());
    };
    tracing::info!(path = %path.display(), owners = document.len(), "Loaded JSON data");

    let mut report = MigrationReport::default();
    for (owner, entries) in &document {
        let Some(entries) = entries.as_object() else {
            tracing::warn!(owner = %owner, "Skipping owner with non-object data");
            report.skipped_owners.push(owner.clone());
            continue;
        };

        for (name, value) in entries {
            report.total += 1;
            if target.set(owner, name, &value_text(value)).await {
                report.migrated += 1;
            } else {
                tracing::error!(owner = %owner, name = %name, "Failed to migrate entry");
                report.failed.push((owner.clone(), name.clone()));
            }
        }
    }

    tracing::info!(
        migrated = report.migrated,
        total = report.total,
        backend = %target.kind(),
        "Migration completed"
    );

    let backup = backup_path(path);
    match fs::copy(path, &backup) {
        Ok(_) => {
            tracing::info!(backup = %backup.display(), "Backup of JSON file created");
            report.backup = Some(backup);
        },
        Err(e) => {
            tracing::warn!(backup = %backup.display(), error = %e, "Could not create backup file");
        },
    }

    Ok(report)
}

/// Compares the JSON document at `path` against `target`, entry by entry.
///
/// Values must match byte for byte. A missing file passes trivially.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or is not a JSON
/// object.
pub async fn verify_migration(path: &Path, target: &VaultStore) -> Result<VerificationReport> {
    let Some(document) = load_source(path)? else {
        tracing::info!(path = %path.display(), "No JSON file to verify against");
        return Ok(VerificationReport::default());
    };

    let mut report = VerificationReport::default();
    for (owner, entries) in &document {
        let Some(entries) = entries.as_object() else {
            continue;
        };

        let Some(stored) = target.get_all(owner).await else {
            if !entries.is_empty() {
                tracing::error!(owner = %owner, "Owner not found in target");
                report.mismatches.push(Mismatch::MissingOwner {
                    owner: owner.clone(),
                });
            }
            continue;
        };

        for (name, value) in entries {
            report.checked += 1;
            let expected = value_text(value);
            match stored.get(name) {
                None => {
                    tracing::error!(owner = %owner, name = %name, "Entry not found in target");
                    report.mismatches.push(Mismatch::MissingName {
                        owner: owner.clone(),
                        name: name.clone(),
                    });
                },
                Some(actual) if *actual != expected => {
                    tracing::error!(owner = %owner, name = %name, "Value mismatch");
                    report.mismatches.push(Mismatch::ValueDiffers {
                        owner: owner.clone(),
                        name: name.clone(),
                        expected,
                        actual: actual.clone(),
                    });
                },
                Some(_) => {},
            }
        }
    }

    if report.passed() {
        tracing::info!(checked = report.checked, "Migration verification passed");
    } else {
        tracing::error!(
            mismatches = report.mismatches.len(),
            "Migration verification failed"
        );
    }
    Ok(report)
}

/// Reads the source document; `None` if the file does not exist.
fn load_source(path: &Path) -> Result<Option<Map<String, Value>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        },
    };

    let value: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(Some(map)),
        _ => bail!("{} does not contain a JSON object", path.display()),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `<path>.backup`
fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".backup");
    PathBuf::from(name)
}
