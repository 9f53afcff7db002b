//! Limits and defaults shared across the vault.
//!
//! All lengths are counted in characters (Unicode scalar values), not bytes.

/// Maximum length of an entry name.
pub const MAX_NAME_LENGTH: usize = 50;

/// Maximum length of an entry value.
///
/// Chosen to leave room for message framing under the 2000-character
/// limit of chat messages.
pub const MAX_VALUE_LENGTH: usize = 1900;

/// Maximum number of entries a single owner may hold.
pub const MAX_ITEMS_PER_USER: usize = 100;

/// Values longer than this are truncated when shown back to the user.
pub const DISPLAY_VALUE_LIMIT: usize = 1800;

/// Number of characters shown per value in the full listing.
pub const PREVIEW_LENGTH: usize = 50;

/// Default location of the JSON document used by the file backend.
pub const DEFAULT_DATA_FILE: &str = "user_data.json";

/// Default PostgreSQL port.
pub const DEFAULT_PG_PORT: u16 = 5432;

/// Default size of the PostgreSQL connection pool.
pub const DEFAULT_PG_MAX_CONNECTIONS: u32 = 8;

/// Default PostgreSQL connect timeout in milliseconds.
pub const DEFAULT_PG_CONNECT_TIMEOUT_MS: u64 = 5_000;
