//! Configuration for the vault.
//!
//! Everything is read from environment variables (the binary seeds them
//! from a `.env` file first). Parsing goes through a lookup function so
//! tests can supply variables without touching the process environment.
//!
//! - [`VaultConfig`] - Root configuration
//! - [`RelationalConfig`] - Whether the PostgreSQL backend should be tried
//! - [`PostgresConfig`] - Connection parameters for PostgreSQL

use crate::constants::{
    DEFAULT_DATA_FILE, DEFAULT_PG_CONNECT_TIMEOUT_MS, DEFAULT_PG_MAX_CONNECTIONS, DEFAULT_PG_PORT,
};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Variables that must all be set for the PostgreSQL backend to be tried.
pub const REQUIRED_PG_VARS: [&str; 4] = ["PGHOST", "PGDATABASE", "PGUSER", "PGPASSWORD"];

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Root configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// JSON document used by the file backend (`VAULT_DATA_FILE`).
    pub data_file: PathBuf,
    /// PostgreSQL settings, if any.
    pub postgres: RelationalConfig,
}

impl VaultConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = non_empty(lookup);
        let data_file = lookup("VAULT_DATA_FILE")
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_FILE), PathBuf::from);

        Self {
            data_file,
            postgres: RelationalConfig::from_lookup(&lookup),
        }
    }
}

/// Three-state view of the PostgreSQL configuration.
#[derive(Debug, Clone)]
pub enum RelationalConfig {
    /// Not all of [`REQUIRED_PG_VARS`] are set. The file backend is used
    /// without attempting a connection.
    Absent,
    /// All required variables are set but something is unusable.
    Invalid(ConfigError),
    /// Ready to attempt a connection.
    Ready(PostgresConfig),
}

impl RelationalConfig {
    fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if !REQUIRED_PG_VARS.iter().all(|var| lookup(*var).is_some()) {
            return Self::Absent;
        }
        match PostgresConfig::from_lookup(lookup) {
            Ok(config) => Self::Ready(config),
            Err(err) => Self::Invalid(err),
        }
    }

    /// Returns true if the relational backend should be attempted.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// PostgreSQL connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// `PGHOST`
    pub host: String,
    /// `PGPORT`, defaults to 5432.
    pub port: u16,
    /// `PGDATABASE`
    pub dbname: String,
    /// `PGUSER`
    pub user: String,
    /// `PGPASSWORD`
    pub password: String,
    /// `VAULT_PG_MAX_CONNECTIONS`
    pub max_connections: u32,
    /// `VAULT_PG_CONNECT_TIMEOUT_MS`
    pub connect_timeout_ms: u64,
}

impl PostgresConfig {
    /// Build a config from required parameters, using defaults for the rest.
    pub fn new(
        host: impl Into<String>,
        dbname: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PG_PORT,
            dbname: dbname.into(),
            user: user.into(),
            password: password.into(),
            max_connections: DEFAULT_PG_MAX_CONNECTIONS,
            connect_timeout_ms: DEFAULT_PG_CONNECT_TIMEOUT_MS,
        }
    }

    /// Parse connection parameters from a variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for the first unset required
    /// variable, or [`ConfigError::Invalid`] if a numeric variable does not
    /// parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = non_empty(lookup);
        let required = |var: &'static str| lookup(var).ok_or(ConfigError::Missing(var));

        Ok(Self {
            host: required("PGHOST")?,
            port: parse_or(&lookup, "PGPORT", DEFAULT_PG_PORT)?,
            dbname: required("PGDATABASE")?,
            user: required("PGUSER")?,
            password: required("PGPASSWORD")?,
            max_connections: parse_or(
                &lookup,
                "VAULT_PG_MAX_CONNECTIONS",
                DEFAULT_PG_MAX_CONNECTIONS,
            )?,
            connect_timeout_ms: parse_or(
                &lookup,
                "VAULT_PG_CONNECT_TIMEOUT_MS",
                DEFAULT_PG_CONNECT_TIMEOUT_MS,
            )?,
        })
    }

    /// Check that every required parameter is non-empty and the pool
    /// settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the first empty parameter,
    /// or [`ConfigError::Invalid`] for a zero pool size or connect timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("PGHOST", &self.host),
            ("PGDATABASE", &self.dbname),
            ("PGUSER", &self.user),
            ("PGPASSWORD", &self.password),
        ];
        if let Some((var, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Missing(*var));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "VAULT_PG_MAX_CONNECTIONS",
                reason: "pool size must be greater than zero".to_string(),
            });
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "VAULT_PG_CONNECT_TIMEOUT_MS",
                reason: "connect timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Driver-level connection config.
    pub(crate) fn to_pg_config(&self) -> postgres::Config {
        let mut config = postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password)
            .connect_timeout(self.connect_timeout());
        config
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .finish()
    }
}

fn non_empty<F>(lookup: F) -> impl Fn(&str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    move |key: &str| lookup(key).filter(|value| !value.is_empty())
}

fn parse_or<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: format!("{raw:?}: {e}"),
        }),
    }
}
