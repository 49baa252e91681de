//! pesslock CLI - pessimistic lock coordination for shared records

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pesslock_core::config::Config;
use pesslock_core::domain::locking::ResourceId;
use pesslock_core::domain::records::{Book, BookField, InMemoryRecordRepository, RecordRepository};
use pesslock_core::domain::session::SessionManager;
use pesslock_core::Error;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pesslock")]
#[command(author, version, about = "Pessimistic lock coordination for shared records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the two-user contention walkthrough
    Demo,

    /// Read a field of the demo book under a lock
    Read {
        /// Field name (Title or Author)
        field: String,
        /// Book ID (defaults to demo.book_id)
        #[arg(short, long)]
        book: Option<ResourceId>,
    },

    /// Write a field of the demo book and print the committed record
    Write {
        /// Field name (Title or Author)
        field: String,
        /// New value
        value: String,
        /// Book ID (defaults to demo.book_id)
        #[arg(short, long)]
        book: Option<ResourceId>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the whole configuration as TOML
    Show,
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
    /// Reset to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load();

    // RUST_LOG wins over the configured filter
    let directive = config
        .as_ref()
        .map(|c| c.logging.filter.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&directive))?,
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Demo => cmd_demo(&config?, cli.quiet).await,

        Commands::Read { field, book } => cmd_read(&config?, &field, book).await,

        Commands::Write { field, value, book } => {
            cmd_write(&config?, &field, &value, book).await
        }

        // Loads on its own so a broken file can still be inspected or reset
        Commands::Config { action } => cmd_config(action, cli.quiet),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Seed an in-memory store with the configured demo book
async fn demo_manager(config: &Config) -> anyhow::Result<SessionManager> {
    let store = Arc::new(InMemoryRecordRepository::new());
    let book = Book::new(config.demo.book_id, config.demo.title.clone());
    store.add(&book).await?;
    info!(book_id = book.id, title = %book.title, "Book added to repository");

    Ok(SessionManager::with_config(store, config.manager_config()))
}

async fn cmd_demo(config: &Config, quiet: bool) -> anyhow::Result<()> {
    let demo = &config.demo;
    let book_id = demo.book_id;
    let manager = demo_manager(config).await?;

    let alice = manager.new_session("Alice").await;
    let bob = manager.new_session("Bob").await;
    let start = Instant::now();

    if !quiet {
        println!("Book {} starts with title '{}'", book_id, demo.title);
        println!("Alice initiated WRITE on book {}", book_id);
    }
    let alice_write = {
        let manager = manager.clone();
        let alice = alice.clone();
        let new_title = demo.new_title.clone();
        tokio::spawn(async move {
            manager
                .write(&alice, book_id, BookField::Title, new_title)
                .await
        })
    };

    tokio::time::sleep_until(start + Duration::from_millis(demo.probe_delay_ms)).await;

    match manager.read(&bob, book_id, BookField::Title).await {
        Err(e) if e.is_lock_conflict() => {
            if !quiet {
                println!("Bob is unable to READ book {} while Alice edits: {}", book_id, e);
            }
        }
        Ok(title) => anyhow::bail!("UNEXPECTED: Bob read '{}' while Alice held the lock", title),
        Err(e) => return Err(e.into()),
    }

    match manager
        .write(&bob, book_id, BookField::Title, demo.rival_title.clone())
        .await
    {
        Err(e) if e.is_lock_conflict() => {
            if !quiet {
                println!("Bob is unable to WRITE book {} while Alice edits: {}", book_id, e);
            }
        }
        Ok(_) => anyhow::bail!("UNEXPECTED: Bob wrote book {} while Alice held the lock", book_id),
        Err(e) => return Err(e.into()),
    }

    if !quiet {
        for lock in manager.lock_table().snapshot() {
            println!("Lock table: {} held by session {}", lock.lock_key(), lock.owner);
        }
    }

    tokio::time::sleep_until(start + Duration::from_millis(demo.settle_delay_ms)).await;

    let committed = alice_write.await??;
    if !quiet {
        println!("Alice committed title '{}' on book {}", committed.title, book_id);
    }

    let title = manager.read(&bob, book_id, BookField::Title).await?;
    if title != demo.new_title {
        warn!(expected = %demo.new_title, actual = %title, "Bob did not fetch the updated title");
        anyhow::bail!("UNEXPECTED: Bob read '{}' instead of '{}'", title, demo.new_title);
    }
    println!("Bob read title: {}", title);

    for session in [alice, bob] {
        manager.remove_session(&session).await?;
    }
    Ok(())
}

async fn cmd_read(config: &Config, field: &str, book: Option<ResourceId>) -> anyhow::Result<()> {
    let field: BookField = field.parse()?;
    let manager = demo_manager(config).await?;
    let session = manager.new_session(whoami()).await;

    let value = manager
        .read(&session, book.unwrap_or(config.demo.book_id), field)
        .await
        .map_err(explain)?;
    println!("{}", value);

    manager.remove_session(&session).await?;
    Ok(())
}

async fn cmd_write(
    config: &Config,
    field: &str,
    value: &str,
    book: Option<ResourceId>,
) -> anyhow::Result<()> {
    let field: BookField = field.parse()?;
    let manager = demo_manager(config).await?;
    let session = manager.new_session(whoami()).await;

    let committed = manager
        .write(&session, book.unwrap_or(config.demo.book_id), field, value)
        .await
        .map_err(explain)?;
    println!("{}", serde_json::to_string_pretty(&committed)?);

    manager.remove_session(&session).await?;
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER").unwrap_or_else(|_| "cli".to_string())
}

/// Attach the error code and suggestion to a domain error
fn explain(error: Error) -> anyhow::Error {
    let code = error.code();
    match error.suggestion() {
        Some(hint) => anyhow::anyhow!("[{}] {}\n  hint: {}", code, error, hint),
        None => anyhow::anyhow!("[{}] {}", code, error),
    }
}
