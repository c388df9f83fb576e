//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `open_session` - Database plus the engine context for derivations
//! - `cmd_init` - Initialize the database
//! - `cmd_status` - Database status and record counts

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::debug;
use tally_core::db::{Encryption, DB_KEY_ENV};
use tally_core::{Database, EngineConfig, EngineContext};

fn encryption(no_encrypt: bool) -> Result<Encryption> {
    if no_encrypt {
        Ok(Encryption::Disabled)
    } else {
        Ok(Encryption::from_env()?)
    }
}

/// Open the ledger, encrypted unless `--no-encrypt` was given
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::open(path, encryption(no_encrypt)?)
        .with_context(|| format!("Failed to open {}", db_path.display()))
}

/// Build the derivation context from `--as-of` and `--config`
pub fn engine_context(as_of: Option<&str>, config_path: Option<&Path>) -> Result<EngineContext> {
    let config = match config_path {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    match as_of {
        Some(s) => {
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .context("Invalid --as-of date format (use YYYY-MM-DD)")?;
            Ok(EngineContext::new(date, config))
        }
        None => Ok(EngineContext::today(config)),
    }
}

/// Open the database and build the engine context in one step
pub fn open_session(
    db_path: &Path,
    no_encrypt: bool,
    as_of: Option<&str>,
    config_path: Option<&Path>,
) -> Result<(Database, EngineContext)> {
    let ctx = engine_context(as_of, config_path)?;
    let db = open_db(db_path, no_encrypt)?;
    debug!(as_of = %ctx.as_of, cutoff = %ctx.import_cutoff(), "Opened session");
    Ok((db, ctx))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;
    println!(
        "✅ Ledger ready at {} (schema v{}, {})",
        db_path.display(),
        db.schema_version()?,
        if db.is_encrypted() { "encrypted" } else { "NOT encrypted" }
    );
    println!();
    println!("Next:");
    println!("  tally feed link --provider simplefin --token <setup-token>");
    println!("  tally feed sync --all");
    Ok(())
}

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("📒 {}", db_path.display());

    if !db_path.exists() {
        println!("   Not initialized. Run 'tally init'.");
        return Ok(());
    }

    let bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    println!("   File:       {:.1} KiB", bytes as f64 / 1024.0);

    let db = match open_db(db_path, no_encrypt) {
        Ok(db) => db,
        Err(e) => {
            println!("   ❌ {:#}", e);
            if !no_encrypt {
                println!("   Is {} set to the right passphrase?", DB_KEY_ENV);
            }
            return Ok(());
        }
    };

    println!(
        "   Encryption: {}",
        if db.is_encrypted() { "on" } else { "off (--no-encrypt)" }
    );
    println!("   Schema:     v{}", db.schema_version()?);

    let counts = db.collection_counts()?;
    if counts.is_empty() {
        println!("   No records yet");
    }
    for (collection, count) in counts {
        println!("   {:<18} {:>6}", collection, count);
    }
    Ok(())
}
