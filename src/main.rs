//! # Docket CLI (`docket`)
//!
//! ## Usage
//!
//! ```bash
//! docket --config ./config/docket.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docket init` | Create the SQLite database and run schema migrations |
//! | `docket upload <file> --license <id>` | Store a PDF and create a record |
//! | `docket update <id>` | Extract, distill, and index a record |
//! | `docket search <terms..>` | Ranked retrieval |
//! | `docket autocomplete` | List known keywords |
//! | `docket documents <license>` | List a tenant's records |
//! | `docket serve` | Start the HTTP API |
//!
//! Log verbosity is controlled with `RUST_LOG` (default `docket=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docket::{commands, config, migrate, server};

/// Docket: keyword indexing and ranked retrieval for legal PDFs.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docket.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docket",
    about = "Docket: keyword indexing and ranked retrieval for legal PDFs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docket.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Store a PDF and create a record that owns it.
    Upload {
        /// Path to the PDF file.
        file: PathBuf,

        /// Tenant that owns the new record.
        #[arg(long)]
        license: String,
    },

    /// Run the extraction pipeline for a record and persist its keywords,
    /// summary, and metadata.
    Update {
        /// Record id.
        id: String,

        /// Spell-correct the extracted text before distilling it.
        #[arg(long)]
        spell: bool,

        /// Manual keyword, placed ahead of the selected ones. Repeatable.
        #[arg(long = "keyword")]
        keywords: Vec<String>,
    },

    /// Search indexed records.
    Search {
        /// Query terms, most important first.
        #[arg(required = true)]
        terms: Vec<String>,

        /// Treat the terms as one free-text query and order them by salience.
        #[arg(long)]
        text: bool,

        /// Maximum number of results.
        #[arg(long)]
        top: Option<usize>,

        /// Weigh every term equally instead of by position.
        #[arg(long)]
        unordered: bool,
    },

    /// List the unique keywords across all records.
    Autocomplete {
        #[arg(long)]
        limit: Option<usize>,

        /// Sort lexicographically instead of first-seen order.
        #[arg(long)]
        sort: bool,
    },

    /// List every record owned by a tenant.
    Documents {
        /// License (tenant) id.
        license: String,
    },

    /// Start the HTTP API server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docket=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Upload { file, license } => {
            commands::run_upload(&cfg, &file, &license).await?;
        }
        Commands::Update {
            id,
            spell,
            keywords,
        } => {
            commands::run_update_cmd(&cfg, &id, spell, keywords).await?;
        }
        Commands::Search {
            terms,
            text,
            top,
            unordered,
        } => {
            commands::run_search(&cfg, terms, text, top, unordered).await?;
        }
        Commands::Autocomplete { limit, sort } => {
            commands::run_autocomplete(&cfg, limit, sort).await?;
        }
        Commands::Documents { license } => {
            commands::run_documents(&cfg, &license).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
