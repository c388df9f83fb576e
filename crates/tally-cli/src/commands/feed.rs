//! Bank-feed commands (link, relink, sync, list)

use anyhow::{Context, Result};
use tally_core::feed::belongs_to;
use tally_core::models::{BankFeedConnection, FeedProviderKind, Transaction};
use tally_core::{Database, EngineContext, RecordStore, Reconciler, SyncReport};

use super::Output;

fn print_report(report: &SyncReport) {
    println!("✅ Synced {}", report.connection_id);
    println!(
        "   Accounts: {} new, {} existing",
        report.accounts_inserted, report.accounts_existing
    );
    println!(
        "   Transactions: {} merged, {} skipped, {} pruned",
        report.transactions_upserted, report.transactions_skipped, report.transactions_pruned
    );
}

pub async fn cmd_feed_link(
    db: Database,
    ctx: EngineContext,
    provider: &str,
    token: &str,
    institution: &str,
    output: Output,
) -> Result<()> {
    let provider: FeedProviderKind = provider.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let reconciler = Reconciler::new(db, ctx);
    let connection = reconciler
        .link(provider, token, institution)
        .await
        .context("Failed to link connection")?;

    if output.emit_json(&connection)? {
        return Ok(());
    }
    println!("🔗 Linked {} connection {}", provider.label(), connection.connection_id);
    println!("   Run 'tally feed sync {}' to import", connection.connection_id);
    Ok(())
}

pub async fn cmd_feed_relink(
    db: Database,
    ctx: EngineContext,
    connection_id: &str,
    token: &str,
    output: Output,
) -> Result<()> {
    let reconciler = Reconciler::new(db, ctx);
    let connection = reconciler
        .relink(connection_id, token)
        .await
        .context("Failed to relink connection")?;

    if output.emit_json(&connection)? {
        return Ok(());
    }
    println!("🔗 Relinked {}", connection.connection_id);
    Ok(())
}

pub async fn cmd_feed_sync(
    db: Database,
    ctx: EngineContext,
    connection_id: Option<&str>,
    all: bool,
    output: Output,
) -> Result<()> {
    let reconciler = Reconciler::new(db, ctx);

    let reports = match (connection_id, all) {
        (Some(id), _) => vec![(id.to_string(), reconciler.sync(id).await)],
        (None, true) => reconciler.sync_all().await?,
        (None, false) => anyhow::bail!("Give a connection id or --all"),
    };

    let mut failures = 0;
    let mut succeeded = Vec::new();
    for (id, result) in reports {
        match result {
            Ok(report) => {
                if !output.json {
                    print_report(&report);
                }
                succeeded.push(report);
            }
            Err(e) => {
                failures += 1;
                eprintln!("❌ Sync failed for {}: {}", id, e);
                if e.is_credential_failure() {
                    eprintln!("   Run 'tally feed relink {} --token <new-token>'", id);
                }
            }
        }
    }
    output.emit_json(&succeeded)?;

    if failures > 0 {
        anyhow::bail!("{} connection(s) failed to sync", failures);
    }
    Ok(())
}

pub fn cmd_feed_list(db: &Database, output: Output) -> Result<()> {
    let connections: Vec<BankFeedConnection> = db.list()?;
    if output.emit_json(&connections)? {
        return Ok(());
    }

    if connections.is_empty() {
        println!("No bank-feed connections. Link one with 'tally feed link'.");
        return Ok(());
    }

    let transactions: Vec<Transaction> = db.list()?;

    println!(
        "{:<32} {:<10} {:<20} {:<8} {:>6} LAST SYNC",
        "ID", "PROVIDER", "INSTITUTION", "STATUS", "TXNS"
    );
    println!("{}", "-".repeat(97));
    for c in &connections {
        let imported = transactions
            .iter()
            .filter(|t| belongs_to(&t.id, &c.connection_id))
            .count();
        let synced = c
            .last_synced_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<32} {:<10} {:<20} {:<8} {:>6} {}",
            c.connection_id,
            c.provider.as_str(),
            super::truncate(&c.institution_name, 20),
            c.status.as_str(),
            imported,
            synced
        );
        if let Some(err) = &c.last_error {
            println!("   last error: {}", err);
        }
    }
    Ok(())
}
