//! Waypoint CLI - Command-line access to the trip-planning record store

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use waypoint::config::{self, WaypointConfig};
use waypoint::storage::{RecordStore, catalog};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(version)]
#[command(about = "Waypoint - Schema-driven record store for trip planning")]
#[command(long_about = r#"
Waypoint stores users, trips, schedule items, contacts and item types in a
single SQLite file. Records are positional: one value per schema field, in
declaration order. In search and delete terms `*` matches any value.

Example usage:
  waypoint init
  waypoint register alice s3cret --fname Alice --lname Liddell
  waypoint insert trips t1 alice Spring Lisbon 2024-04-01 2024-04-09
  waypoint search trips '*' alice '*' '*' '*' '*'
  waypoint login alice s3cret
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// List declared schemas and their statements
    Schemas,

    /// Insert a record
    Insert {
        schema: String,
        /// One value per field, in declaration order
        values: Vec<String>,
    },

    /// Find records matching positional terms
    Search {
        schema: String,
        /// One term per field; `*` is a wildcard
        terms: Vec<String>,
    },

    /// Delete records matching positional terms
    Delete {
        schema: String,
        /// One term per field; `*` is a wildcard
        terms: Vec<String>,
    },

    /// Print every record of a table
    Dump { schema: String },

    /// Show row counts per table
    Stats,

    /// Create a user with a salted password hash
    Register {
        username: String,
        password: String,
        #[arg(long)]
        fname: String,
        #[arg(long)]
        lname: String,
        /// Creation timestamp (defaults to the current Unix time)
        #[arg(long)]
        created_at: Option<String>,
    },

    /// Check a username and password
    Login { username: String, password: String },
}

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

/// Print a JSON success envelope
pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

/// Report a failed command once, on stderr, in the selected format
fn report_failure(mode: OutputMode, error: &anyhow::Error) {
    match mode {
        OutputMode::Human => waypoint::ui::error(&format!("{:#}", error)),
        OutputMode::Json => {
            let envelope = serde_json::json!({
                "ok": false,
                "error": format!("{:#}", error),
            });
            eprintln!("{}", envelope);
        }
    }
}

fn open_store(database: &Path) -> anyhow::Result<RecordStore> {
    config::ensure_db_dir(database)?;
    let store = RecordStore::init(catalog::default_registry()?, database);
    if !store.is_connected() {
        anyhow::bail!("could not open database at {}", database.display());
    }
    Ok(store)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(settings.log_level.as_deref().unwrap_or("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    if let Err(e) = dispatch(cli, &settings, output_mode) {
        report_failure(output_mode, &e);
        std::process::exit(1);
    }
    Ok(())
}

fn dispatch(cli: Cli, settings: &WaypointConfig, output_mode: OutputMode) -> anyhow::Result<()> {
    let database = cli
        .database
        .clone()
        .unwrap_or_else(|| settings.database_path(Path::new(".")));

    match cli.command {
        Commands::Init { force } => {
            let config_path = cli.config.unwrap_or_else(config::default_config_path);
            commands::run_init(output_mode, &config_path, &database, force)
        }
        Commands::Schemas => commands::run_schemas(output_mode),
        Commands::Insert { schema, values } => {
            let store = open_store(&database)?;
            commands::run_insert(output_mode, &store, &schema, &values)
        }
        Commands::Search { schema, terms } => {
            let store = open_store(&database)?;
            commands::run_search(output_mode, &store, &schema, &terms)
        }
        Commands::Delete { schema, terms } => {
            let store = open_store(&database)?;
            commands::run_delete(output_mode, &store, &schema, &terms)
        }
        Commands::Dump { schema } => {
            let store = open_store(&database)?;
            commands::run_dump(output_mode, &store, &schema)
        }
        Commands::Stats => {
            let store = open_store(&database)?;
            commands::run_stats(output_mode, &store, &database)
        }
        Commands::Register { username, password, fname, lname, created_at } => {
            let store = open_store(&database)?;
            let created_at = created_at.unwrap_or_else(commands::unix_now);
            let profile = [
                ("fname", fname.as_str()),
                ("lname", lname.as_str()),
                ("createdAt", created_at.as_str()),
            ];
            commands::run_register(output_mode, &store, &username, &password, &profile)
        }
        Commands::Login { username, password } => {
            let store = open_store(&database)?;
            commands::run_login(output_mode, &store, &username, &password)
        }
    }
}
