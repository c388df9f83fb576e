//! Backup export and restore
//!
//! A backup is a versioned JSON envelope holding every collection plus UI
//! preferences. Restores replace each collection wholesale inside one store
//! transaction, so replaying the same backup converges on the same state.
//!
//! Files whose name ends in `.gz` are gzip-compressed transparently.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{
    Bank, BankFeedConnection, Budget, Card, Goal, RetirementEntry, Scenario, Subscription,
    Transaction, UiPreferences,
};
use crate::store::{Collection, Record, RecordStore, WriteBatch};

pub const BACKUP_FORMAT: &str = "tally-backup";
pub const BACKUP_VERSION: u32 = 1;

/// Every collection in a backup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub banks: Vec<Bank>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub retirement_entries: Vec<RetirementEntry>,
    #[serde(default)]
    pub bank_connections: Vec<BankFeedConnection>,
    #[serde(default)]
    pub ui_preferences: UiPreferences,
}

impl BackupData {
    pub fn total_records(&self) -> usize {
        self.transactions.len()
            + self.subscriptions.len()
            + self.cards.len()
            + self.banks.len()
            + self.budgets.len()
            + self.goals.len()
            + self.scenarios.len()
            + self.retirement_entries.len()
            + self.bank_connections.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEnvelope {
    pub format: String,
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub app_version: String,
    pub data: BackupData,
}

/// Snapshot every collection in `store`
pub fn export_backup<S: RecordStore>(store: &S) -> Result<BackupEnvelope> {
    let data = BackupData {
        transactions: store.list()?,
        subscriptions: store.list()?,
        cards: store.list()?,
        banks: store.list()?,
        budgets: store.list()?,
        goals: store.list()?,
        scenarios: store.list()?,
        retirement_entries: store.list()?,
        bank_connections: store.list()?,
        ui_preferences: store.get_ui_preferences()?,
    };

    Ok(BackupEnvelope {
        format: BACKUP_FORMAT.to_string(),
        version: BACKUP_VERSION,
        exported_at: Utc::now(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        data,
    })
}

/// Parse and validate an envelope without touching any store
pub fn parse_backup(bytes: &[u8]) -> Result<BackupEnvelope> {
    // Check the header first so a foreign file gets a clear message
    #[derive(Deserialize)]
    struct Header {
        format: Option<String>,
        version: Option<u32>,
    }

    let header: Header = serde_json::from_slice(bytes)
        .map_err(|e| Error::Backup(format!("Not a JSON backup: {}", e)))?;
    match header.format.as_deref() {
        Some(BACKUP_FORMAT) => {}
        Some(other) => {
            return Err(Error::Backup(format!("Unrecognized backup format: {}", other)));
        }
        None => return Err(Error::Backup("Backup has no format marker".to_string())),
    }
    match header.version {
        Some(v) if v <= BACKUP_VERSION => {}
        Some(v) => {
            return Err(Error::Backup(format!(
                "Backup version {} is newer than supported version {}",
                v, BACKUP_VERSION
            )));
        }
        None => return Err(Error::Backup("Backup has no version".to_string())),
    }

    serde_json::from_slice(bytes).map_err(|e| Error::Backup(format!("Malformed backup: {}", e)))
}

fn stage_all<R: Record>(batch: &mut WriteBatch, records: &[R]) -> Result<()> {
    for record in records {
        batch.upsert(record)?;
    }
    Ok(())
}

/// Replace every collection with the envelope's contents, atomically.
///
/// Returns the number of records restored.
pub fn restore_backup<S: RecordStore>(store: &S, envelope: &BackupEnvelope) -> Result<usize> {
    let data = &envelope.data;
    let mut batch = WriteBatch::new();
    stage_all(&mut batch, &data.transactions)?;
    stage_all(&mut batch, &data.subscriptions)?;
    stage_all(&mut batch, &data.cards)?;
    stage_all(&mut batch, &data.banks)?;
    stage_all(&mut batch, &data.budgets)?;
    stage_all(&mut batch, &data.goals)?;
    stage_all(&mut batch, &data.scenarios)?;
    stage_all(&mut batch, &data.retirement_entries)?;
    stage_all(&mut batch, &data.bank_connections)?;
    batch.set_ui_preferences(&data.ui_preferences)?;

    store.replace(Collection::all(), &batch)?;

    let total = data.total_records();
    info!(
        records = total,
        exported_at = %envelope.exported_at,
        "Restored backup"
    );
    Ok(total)
}

fn is_gzip(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

/// Write an envelope as pretty JSON, gzipped if the name ends in `.gz`
pub fn write_backup_file(envelope: &BackupEnvelope, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        Error::Backup(format!("Failed to create {}: {}", path.display(), e))
    })?;
    let writer = BufWriter::new(file);

    if is_gzip(path) {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        serde_json::to_writer_pretty(&mut encoder, envelope)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = writer;
        serde_json::to_writer_pretty(&mut writer, envelope)?;
        writer.flush()?;
    }

    info!(
        "Wrote backup ({} records) to {}",
        envelope.data.total_records(),
        path.display()
    );
    Ok(())
}

/// Read and validate a backup file
pub fn read_backup_file(path: &Path) -> Result<BackupEnvelope> {
    let file = File::open(path)
        .map_err(|e| Error::Backup(format!("Backup not found: {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);

    let mut bytes = Vec::new();
    if is_gzip(path) {
        GzDecoder::new(reader).read_to_end(&mut bytes)?;
    } else {
        reader.read_to_end(&mut bytes)?;
    }
    parse_backup(&bytes)
}
