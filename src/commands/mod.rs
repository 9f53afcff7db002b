//! Vault command handlers.
//!
//! Platform-agnostic implementations of the user commands. Each handler
//! validates its input, talks to the bound [`VaultStore`], and returns a
//! [`Reply`] that the host (chat bot, CLI) renders as-is:
//!
//! - `save` - Store or overwrite a named value
//! - `get` - Show one value, or every entry with a short preview
//! - `delete` - Remove a named value
//! - `list` - Show the names in use against the per-owner limit

use crate::constants::{DISPLAY_VALUE_LIMIT, MAX_ITEMS_PER_USER, PREVIEW_LENGTH};
use crate::store::VaultStore;
use crate::utils::truncate_chars;
use crate::validation::{ValidationError, validate_name, validate_value};
use serde::Serialize;

/// Outcome category of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    /// The command changed or returned data.
    Success,
    /// The named entry does not exist.
    NotFound,
    /// Input failed validation or the owner is at capacity.
    Rejected,
    /// Storage could not complete the operation.
    Failed,
    /// Informational, e.g. nothing stored yet.
    Info,
}

/// A rendered command result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub status: ReplyStatus,
    pub text: String,
}

impl Reply {
    fn new(status: ReplyStatus, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    fn rejected(error: &ValidationError) -> Self {
        Self::new(ReplyStatus::Rejected, format!("❌ **Error**\n\n{error}"))
    }

    fn nothing_stored() -> Self {
        Self::new(ReplyStatus::Info, "📋 **Stored data**\n\nNo data stored.")
    }

    pub fn is_success(&self) -> bool {
        self.status == ReplyStatus::Success
    }
}

/// Runs vault commands against a store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    store: VaultStore,
}

impl CommandHandler {
    pub fn new(store: VaultStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    /// Stores `value` under `name`.
    ///
    /// A new name is refused once the owner holds [`MAX_ITEMS_PER_USER`]
    /// entries; overwriting an existing name is always allowed. The count
    /// check and the write are separate calls, so concurrent saves by one
    /// owner may overshoot the limit slightly.
    pub async fn save(&self, owner: &str, name: &str, value: &str) -> Reply {
        if let Err(e) = validate_name(name).and_then(|()| validate_value(value)) {
            return Reply::rejected(&e);
        }

        if self.store.count(owner).await >= MAX_ITEMS_PER_USER
            && self.store.get(owner, name).await.is_none()
        {
            tracing::info!(owner, name, "Save refused, owner at capacity");
            return Reply::new(
                ReplyStatus::Rejected,
                format!(
                    "❌ **Error**\n\nYou have reached the limit of {MAX_ITEMS_PER_USER} stored items.\n\
                     Delete entries you no longer need."
                ),
            );
        }

        if self.store.set(owner, name, value).await {
            Reply::new(
                ReplyStatus::Success,
                format!("✅ **Saved**\n\nSaved data \"{name}\"."),
            )
        } else {
            Reply::new(ReplyStatus::Failed, "❌ **Error**\n\nFailed to save data.")
        }
    }

    /// Shows one entry, or every entry when `name` is `None` or empty.
    pub async fn get(&self, owner: &str, name: Option<&str>) -> Reply {
        match name {
            Some(name) if !name.is_empty() => self.get_one(owner, name).await,
            _ => self.get_all(owner).await,
        }
    }

    async fn get_one(&self, owner: &str, name: &str) -> Reply {
        if let Err(e) = validate_name(name) {
            return Reply::rejected(&e);
        }

        let Some(value) = self.store.get(owner, name).await else {
            return Reply::new(
                ReplyStatus::NotFound,
                format!("🔍 **Search**\n\nData \"{name}\" was not found."),
            );
        };

        let text = match truncate_chars(&value, DISPLAY_VALUE_LIMIT) {
            (shown, true) => format!(
                "📄 **Data: {name}** (partial)\n\n```\n{shown}...\n```\n\n\
                 💡 The value is too long, only the beginning is shown."
            ),
            (shown, false) => format!("📄 **Data: {name}**\n\n```\n{shown}\n```"),
        };
        Reply::new(ReplyStatus::Success, text)
    }

    async fn get_all(&self, owner: &str) -> Reply {
        let Some(entries) = self.store.get_all(owner).await else {
            return Reply::nothing_stored();
        };

        let lines: Vec<String> = entries
            .iter()
            .map(|(name, value)| {
                let (preview, cut) = truncate_chars(value, PREVIEW_LENGTH);
                let ellipsis = if cut { "..." } else { "" };
                format!("• **{name}**: {preview}{ellipsis}")
            })
            .collect();

        Reply::new(
            ReplyStatus::Success,
            format!(
                "📋 **Stored data**\n\n{}\n\nTotal: {}",
                lines.join("\n"),
                entries.len()
            ),
        )
    }

    /// Removes `name`.
    pub async fn delete(&self, owner: &str, name: &str) -> Reply {
        if let Err(e) = validate_name(name) {
            return Reply::rejected(&e);
        }

        if self.store.delete(owner, name).await {
            Reply::new(
                ReplyStatus::Success,
                format!("🗑️ **Deleted**\n\nDeleted data \"{name}\"."),
            )
        } else {
            Reply::new(
                ReplyStatus::NotFound,
                format!("⚠️ **Error**\n\nData \"{name}\" was not found."),
            )
        }
    }

    /// Lists the owner's names with usage against the limit.
    pub async fn list(&self, owner: &str) -> Reply {
        let Some(entries) = self.store.get_all(owner).await else {
            return Reply::nothing_stored();
        };

        let names: Vec<String> = entries.keys().map(|name| format!("• {name}")).collect();
        Reply::new(
            ReplyStatus::Success,
            format!(
                "📋 **Stored data**\n\n{}\n\nTotal: {} / Limit: {MAX_ITEMS_PER_USER}",
                names.join("\n"),
                entries.len()
            ),
        )
    }
}
