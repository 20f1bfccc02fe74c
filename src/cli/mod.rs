//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::model::{DeleteMode, KeyScheme};
use crate::sync::SyncStrategy;

pub mod commands;

/// Paprika - article store with atomic batch synchronization
#[derive(Parser, Debug)]
#[command(name = "paprika", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.paprika/data/paprika.db)
    #[arg(long, global = true, env = "PAPRIKA_DB")]
    pub db: Option<PathBuf>,

    /// Config file path (default: ~/.paprika/config.json)
    #[arg(long, global = true, env = "PAPRIKA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Listen address (overrides config)
        #[arg(long, env = "PAPRIKA_BIND")]
        bind: Option<String>,

        #[command(flatten)]
        sync: SyncArgs,

        /// Delete behavior for DELETE /articles/{id}
        #[arg(long, value_enum)]
        delete_mode: Option<DeleteMode>,
    },

    /// Reconcile a batch file (JSON, JSON array or JSONL) into the store
    Import {
        /// Batch file to import
        file: PathBuf,

        #[command(flatten)]
        sync: SyncArgs,

        /// Validate only, write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Build a sync batch from a directory of markdown files
    Scan {
        /// Directory to scan
        dir: PathBuf,

        #[command(flatten)]
        sync: SyncArgs,

        /// Reconcile the scanned batch into the store
        #[arg(long)]
        apply: bool,

        /// Write the batch payload to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List articles, freshest first
    List {
        /// Include soft-deleted articles
        #[arg(long)]
        include_deleted: bool,

        /// Maximum number of articles
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Show one article by ID (soft-deleted articles included)
    Show {
        /// Article ID
        id: i64,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Strategy overrides shared by the commands that reconcile.
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Reconciliation strategy (overrides config)
    #[arg(long, value_enum)]
    pub strategy: Option<SyncStrategy>,

    /// Natural key field (overrides config)
    #[arg(long, value_enum)]
    pub key_scheme: Option<KeyScheme>,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
