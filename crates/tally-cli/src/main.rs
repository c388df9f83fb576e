//! Tally CLI - Personal finance ledger
//!
//! Usage:
//!   tally init                         Initialize database
//!   tally balances                     Live account balances
//!   tally insights --as-of 2026-03-31  Insights for a past date
//!   tally feed sync --all              Sync every bank-feed connection

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let output = commands::Output { json: cli.json };
    let session = || {
        commands::open_session(
            &cli.db,
            cli.no_encrypt,
            cli.as_of.as_deref(),
            cli.config.as_deref(),
        )
    };

    match &cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Balances => {
            let (db, ctx) = session()?;
            commands::cmd_balances(&db, &ctx, output)
        }
        Commands::NetWorth => {
            let (db, ctx) = session()?;
            commands::cmd_net_worth(&db, &ctx, output)
        }
        Commands::Budgets => {
            let (db, ctx) = session()?;
            commands::cmd_budgets(&db, &ctx, output)
        }
        Commands::Insights => {
            let (db, ctx) = session()?;
            commands::cmd_insights(&db, &ctx, output)
        }
        Commands::Health => {
            let (db, ctx) = session()?;
            commands::cmd_health(&db, &ctx, output)
        }
        Commands::Goals => {
            let (db, ctx) = session()?;
            commands::cmd_goals(&db, &ctx, output)
        }
        Commands::Scenario { id } => {
            let (db, ctx) = session()?;
            commands::cmd_scenario(&db, &ctx, id, output)
        }
        Commands::Feed { action } => {
            let (db, ctx) = session()?;
            match action {
                FeedAction::Link {
                    provider,
                    token,
                    institution,
                } => commands::cmd_feed_link(db, ctx, provider, token, institution, output).await,
                FeedAction::Relink {
                    connection_id,
                    token,
                } => commands::cmd_feed_relink(db, ctx, connection_id, token, output).await,
                FeedAction::Sync { connection_id, all } => {
                    commands::cmd_feed_sync(db, ctx, connection_id.as_deref(), *all, output).await
                }
                FeedAction::List => commands::cmd_feed_list(&db, output),
            }
        }
        Commands::Backup { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                BackupAction::Export { file } => commands::cmd_backup_export(&db, file),
                BackupAction::Restore { file, yes } => {
                    commands::cmd_backup_restore(&db, file, *yes)
                }
            }
        }
    }
}
