//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider rejected the access credential (revoked, expired, bad setup token).
    /// Fatal for the current sync; never retried automatically.
    #[error("{provider} credential error: {message}")]
    Credential { provider: String, message: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Backup error: {0}")]
    Backup(String),
}

impl Error {
    /// Whether this failure should mark a bank-feed connection inactive
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Error::Credential { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
