//! vault - personal key-value vault CLI.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use vault::commands::{CommandHandler, Reply};
use vault::config::{RelationalConfig, VaultConfig};
use vault::migrate;
use vault::store::{PostgresBackend, Selection, VaultStore, select_backend};

#[derive(Parser, Debug)]
#[command(name = "vault")]
#[command(about = "Store, retrieve, list, and delete short named values")]
#[command(version)]
struct Cli {
    /// Owner whose entries are used (default: $VAULT_USER, then "local")
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Print replies as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save a value under a name (overwrites)
    Save { name: String, value: String },
    /// Show a value, or every entry when no name is given
    Get { name: Option<String> },
    /// Delete a value
    Delete { name: String },
    /// List stored names
    List,
    /// Show which storage backend is in use
    Backend,
    /// Copy the JSON document into PostgreSQL and verify it
    Migrate {
        /// JSON document to migrate (default: $VAULT_DATA_FILE)
        #[arg(long)]
        json_file: Option<PathBuf>,

        /// Only verify an earlier migration
        #[arg(long)]
        verify_only: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = VaultConfig::from_env();
    let owner = resolve_owner(cli.user);

    let reply = match cli.command {
        Commands::Migrate {
            json_file,
            verify_only,
        } => {
            let path = json_file.unwrap_or_else(|| config.data_file.clone());
            return run_migration(&config, &path, verify_only).await;
        },
        Commands::Backend => {
            let selection = select_backend(&config).await;
            return print_selection(&selection, cli.json);
        },
        Commands::Save { name, value } => handler(&config).await.save(&owner, &name, &value).await,
        Commands::Get { name } => handler(&config).await.get(&owner, name.as_deref()).await,
        Commands::Delete { name } => handler(&config).await.delete(&owner, &name).await,
        Commands::List => handler(&config).await.list(&owner).await,
    };

    print_reply(&reply, cli.json)
}

async fn handler(config: &VaultConfig) -> CommandHandler {
    CommandHandler::new(select_backend(config).await.store)
}

fn resolve_owner(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("VAULT_USER").ok())
        .filter(|user| !user.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

fn print_selection(selection: &Selection, json: bool) -> Result<()> {
    if json {
        let report = serde_json::json!({
            "backend": selection.kind,
            "fallback_reason": selection.fallback_reason,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("backend: {}", selection.kind);
        if let Some(reason) = &selection.fallback_reason {
            println!("fallback: {reason}");
        }
    }
    Ok(())
}

fn print_reply(reply: &Reply, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reply)?);
    } else {
        println!("{}", reply.text);
    }
    Ok(())
}

/// Migrates into PostgreSQL. No fallback: the target must be reachable.
async fn run_migration(config: &VaultConfig, path: &Path, verify_only: bool) -> Result<()> {
    let pg = match &config.postgres {
        RelationalConfig::Ready(pg) => pg,
        RelationalConfig::Invalid(e) => bail!("PostgreSQL configuration is invalid: {e}"),
        RelationalConfig::Absent => bail!(
            "PostgreSQL is not configured; set {}",
            vault::config::REQUIRED_PG_VARS.join(", ")
        ),
    };

    let backend = PostgresBackend::new(pg).context("Failed to configure PostgreSQL")?;
    if !backend.check_connection().await {
        bail!("Cannot connect to PostgreSQL at {}:{}", pg.host, pg.port);
    }
    backend
        .initialize_schema()
        .await
        .context("Failed to initialize PostgreSQL schema")?;
    let target = VaultStore::custom(backend);

    if !verify_only {
        let report = migrate::migrate_json(path, &target).await?;
        println!(
            "Migrated {}/{} entries from {}",
            report.migrated,
            report.total,
            path.display()
        );
        if let Some(backup) = &report.backup {
            println!("Backup written to {}", backup.display());
        }
    }

    let verification = migrate::verify_migration(path, &target).await?;
    if !verification.passed() {
        bail!(
            "Verification failed: {} mismatch(es) in {} checked entries",
            verification.mismatches.len(),
            verification.checked
        );
    }
    println!("Verification passed: {} entries match", verification.checked);
    Ok(())
}

/// Logs go to stderr; stdout carries replies.
fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
