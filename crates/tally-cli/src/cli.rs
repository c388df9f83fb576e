//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Ledger derivations and bank-feed sync for personal finance
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Self-hosted personal finance ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Reference date for derivations (YYYY-MM-DD, default: today)
    #[arg(long, global = true)]
    pub as_of: Option<String>,

    /// Engine config file (default: user override, then embedded defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Show database status and record counts
    Status,

    /// Live balances for every account
    Balances,

    /// Month-by-month net worth
    NetWorth,

    /// Budget status for the current periods
    Budgets,

    /// Run the insight rules
    Insights,

    /// Composite financial health score
    Health,

    /// Progress toward each goal
    Goals,

    /// Evaluate a what-if scenario
    Scenario {
        /// Scenario id
        id: String,
    },

    /// Bank-feed connections
    Feed {
        #[command(subcommand)]
        action: FeedAction,
    },

    /// Backup export and restore
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand)]
pub enum FeedAction {
    /// Link a new connection with a setup token
    Link {
        /// Provider: plaid or simplefin
        #[arg(short, long)]
        provider: String,

        /// Setup token (Plaid public token or SimpleFIN setup token)
        #[arg(short, long)]
        token: String,

        /// Institution name shown in notes
        #[arg(short, long, default_value = "")]
        institution: String,
    },

    /// Reactivate a connection with a fresh setup token
    Relink {
        /// Connection id
        connection_id: String,

        /// New setup token
        #[arg(short, long)]
        token: String,
    },

    /// Sync one connection, or every active connection with --all
    Sync {
        /// Connection id
        connection_id: Option<String>,

        /// Sync every active connection
        #[arg(long, conflicts_with = "connection_id")]
        all: bool,
    },

    /// List connections
    List,
}

#[derive(Subcommand)]
pub enum BackupAction {
    /// Write every collection to a backup file (.gz to compress)
    Export {
        /// Output file
        file: PathBuf,
    },

    /// Replace every collection with a backup's contents
    Restore {
        /// Backup file
        file: PathBuf,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
