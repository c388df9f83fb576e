//! SQLite record store with connection pooling and migrations
//!
//! Every collection lives in one `records` table keyed by
//! `(collection, id)`, holding the record's JSON payload plus an indexed
//! `date` column for range queries. UI preferences live in `settings`.
//! Schema changes are appended to [`MIGRATIONS`] and tracked through
//! `PRAGMA user_version`.
//!
//! - `records` - [`RecordStore`](crate::store::RecordStore) implementation

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info};

use crate::error::{Error, Result};

mod records;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable holding the database passphrase
pub const DB_KEY_ENV: &str = "TALLY_DB_KEY";

const POOL_SIZE: u32 = 8;

/// Fixed salt so a passphrase maps to the same key wherever the file lives.
/// Changing it locks out every existing encrypted ledger.
const KEY_SALT: &[u8] = b"tally.ledger.sqlcipher.v1";

/// Ordered schema steps; index + 1 is the `user_version` after applying
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS records (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        date DATE,
        data TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (collection, id)
    );
    CREATE INDEX IF NOT EXISTS idx_records_collection_date ON records(collection, date);

    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    "#,
];

/// How the database file is protected at rest
#[derive(Clone)]
pub enum Encryption {
    /// SQLCipher keyed from this passphrase
    Passphrase(String),
    /// Plain SQLite (development and tests)
    Disabled,
}

impl Encryption {
    /// Passphrase from `TALLY_DB_KEY`
    pub fn from_env() -> Result<Self> {
        std::env::var(DB_KEY_ENV).map(Self::Passphrase).map_err(|_| {
            Error::Encryption(format!(
                "Set {} to your passphrase, or pass --no-encrypt for an unencrypted \
                 development database.",
                DB_KEY_ENV
            ))
        })
    }
}

/// Stretch a passphrase into a raw 256-bit SQLCipher key (hex)
fn derive_key(passphrase: &str) -> Result<String> {
    let mut key = [0u8; 32];
    argon2::Argon2::default()
        .hash_password_into(passphrase.as_bytes(), KEY_SALT, &mut key)
        .map_err(|e| Error::Encryption(format!("Key derivation failed: {}", e)))?;
    Ok(hex::encode(key))
}

/// Pooled handle to the ledger database
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
    encrypted: bool,
}

impl Database {
    /// Open (or create) the ledger at `path`
    pub fn open(path: &str, encryption: Encryption) -> Result<Self> {
        let encrypted = matches!(encryption, Encryption::Passphrase(_));
        let key_pragma = match &encryption {
            Encryption::Passphrase(pass) => Some(format!("PRAGMA key = \"x'{}'\";", derive_key(pass)?)),
            Encryption::Disabled => None,
        };

        // The key must be the first statement on every pooled connection
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(pragma) = &key_pragma {
                conn.execute_batch(pragma)?;
            }
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )
        });
        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
            encrypted,
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an encrypted database keyed from `TALLY_DB_KEY`
    pub fn new(path: &str) -> Result<Self> {
        Self::open(path, Encryption::from_env()?)
    }

    /// Open without encryption (development/testing only)
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::open(path, Encryption::Disabled)
    }

    /// Fresh, empty database in the temp dir
    ///
    /// A real file rather than `:memory:`, since each pooled connection to
    /// `:memory:` would get a separate database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(0);

        let path = std::env::temp_dir().join(format!(
            "tally-{}-{}.db",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_file(&path);
        Self::new_unencrypted(&path.to_string_lossy())
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Applied schema version
    pub fn schema_version(&self) -> Result<usize> {
        let conn = self.conn()?;
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version.max(0) as usize)
    }

    /// Record counts per collection, for status output
    pub fn collection_counts(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT collection, COUNT(*) FROM records GROUP BY collection ORDER BY collection",
        )?;
        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    fn migrate(&self) -> Result<()> {
        let current = self.schema_version()?;
        if current > MIGRATIONS.len() {
            return Err(Error::InvalidData(format!(
                "Database schema v{} is newer than this build (v{})",
                current,
                MIGRATIONS.len()
            )));
        }

        let mut conn = self.conn()?;
        for (index, step) in MIGRATIONS.iter().enumerate().skip(current) {
            let tx = conn.transaction()?;
            tx.execute_batch(step)?;
            tx.pragma_update(None, "user_version", (index + 1) as i64)?;
            tx.commit()?;
            debug!(version = index + 1, "Applied migration");
        }

        info!(path = %self.db_path, version = MIGRATIONS.len(), "Database ready");
        Ok(())
    }
}
