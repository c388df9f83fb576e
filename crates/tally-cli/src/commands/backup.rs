//! Backup export and restore commands

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tally_core::backup::{export_backup, read_backup_file, restore_backup, write_backup_file};
use tally_core::Database;

pub fn cmd_backup_export(db: &Database, file: &Path) -> Result<()> {
    let envelope = export_backup(db).context("Failed to export backup")?;
    write_backup_file(&envelope, file)
        .with_context(|| format!("Failed to write {}", file.display()))?;

    println!("✅ Backup written: {}", file.display());
    println!("   Records: {}", envelope.data.total_records());
    println!("   Transactions: {}", envelope.data.transactions.len());
    if file.to_string_lossy().ends_with(".gz") {
        println!("   📦 Compressed");
    }
    Ok(())
}

pub fn cmd_backup_restore(db: &Database, file: &Path, yes: bool) -> Result<()> {
    // Parse fully before asking, so a bad file never gets near the store
    let envelope = read_backup_file(file)
        .with_context(|| format!("Failed to read backup {}", file.display()))?;

    println!(
        "Backup from {} (tally {}), {} records",
        envelope.exported_at.format("%Y-%m-%d %H:%M"),
        envelope.app_version,
        envelope.data.total_records()
    );

    if !yes {
        println!("⚠️  This will replace every record in {}", db.path());
        print!("Continue? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let restored = restore_backup(db, &envelope).context("Failed to restore backup")?;
    println!("✅ Restored {} records", restored);
    Ok(())
}
