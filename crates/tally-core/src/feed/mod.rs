//! Bank-feed providers
//!
//! Providers fetch accounts and transactions from an external aggregator and
//! normalize them into [`FeedSnapshot`]s. The reconciler only ever sees the
//! normalized shapes, so both provider styles merge through the same rules.
//!
//! # Architecture
//!
//! - `BankFeedProvider` trait: claim a credential, fetch accounts
//! - `FeedClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Implementations: `PlaidProvider`, `SimpleFinProvider`, `MockProvider`
//!
//! # Sign convention
//!
//! Normalized transaction amounts are negative for money leaving the account
//! (expense) and positive for money arriving (income), whatever convention
//! the provider uses on the wire.

mod mock;
mod plaid;
mod simplefin;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::{AccountKind, FeedProviderKind, BANK_FEED_PREFIX};

pub use mock::{MockProvider, MockResponse};
pub use plaid::{PlaidEnvironment, PlaidProvider};
pub use simplefin::SimpleFinProvider;

/// A transaction as reported by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedTransaction {
    pub provider_tx_id: String,
    pub date: NaiveDate,
    /// Negative = money out
    pub amount: f64,
    pub description: String,
}

/// An account as reported by a provider, with its recent transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedAccount {
    pub provider_account_id: String,
    pub name: String,
    pub institution: Option<String>,
    pub kind: AccountKind,
    /// Bank: balance held. Card: amount owed (non-negative).
    pub balance: f64,
    pub available_balance: Option<f64>,
    pub limit: Option<f64>,
    pub transactions: Vec<FeedTransaction>,
}

/// Everything one fetch returned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub accounts: Vec<FeedAccount>,
    /// Transactions dropped during normalization (e.g. non-numeric amounts)
    pub skipped: usize,
}

/// Interface every bank-feed provider implements
#[async_trait]
pub trait BankFeedProvider: Send + Sync {
    fn kind(&self) -> FeedProviderKind;

    /// Exchange a one-time setup token for a long-lived access credential
    async fn claim_access_credential(&self, setup_token: &str) -> Result<String>;

    /// Fetch accounts and their transactions dated on or after `since`
    async fn fetch_accounts(&self, credential: &str, since: NaiveDate) -> Result<FeedSnapshot>;
}

/// Concrete provider wrapper
///
/// An enum rather than `Box<dyn BankFeedProvider>` so it can be cloned into
/// spawned sync tasks.
#[derive(Clone)]
pub enum FeedClient {
    Plaid(PlaidProvider),
    SimpleFin(SimpleFinProvider),
    /// Scripted provider for tests
    Mock(MockProvider),
}

impl FeedClient {
    /// Build a client for `kind` using the configured request timeout.
    ///
    /// Plaid reads its API keys from the environment; see
    /// [`PlaidProvider::from_env`].
    pub fn for_kind(kind: FeedProviderKind, config: &EngineConfig) -> Result<Self> {
        let http = http_client(config.request_timeout())?;
        match kind {
            FeedProviderKind::SimpleFin => Ok(FeedClient::SimpleFin(SimpleFinProvider::new(http))),
            FeedProviderKind::Plaid => PlaidProvider::from_env(http)
                .map(FeedClient::Plaid)
                .ok_or_else(|| {
                    Error::Config(
                        "Plaid requires PLAID_CLIENT_ID and PLAID_SECRET to be set".to_string(),
                    )
                }),
        }
    }

    pub fn mock(provider: MockProvider) -> Self {
        FeedClient::Mock(provider)
    }
}

#[async_trait]
impl BankFeedProvider for FeedClient {
    fn kind(&self) -> FeedProviderKind {
        match self {
            FeedClient::Plaid(p) => p.kind(),
            FeedClient::SimpleFin(p) => p.kind(),
            FeedClient::Mock(p) => p.kind(),
        }
    }

    async fn claim_access_credential(&self, setup_token: &str) -> Result<String> {
        match self {
            FeedClient::Plaid(p) => p.claim_access_credential(setup_token).await,
            FeedClient::SimpleFin(p) => p.claim_access_credential(setup_token).await,
            FeedClient::Mock(p) => p.claim_access_credential(setup_token).await,
        }
    }

    async fn fetch_accounts(&self, credential: &str, since: NaiveDate) -> Result<FeedSnapshot> {
        match self {
            FeedClient::Plaid(p) => p.fetch_accounts(credential, since).await,
            FeedClient::SimpleFin(p) => p.fetch_accounts(credential, since).await,
            FeedClient::Mock(p) => p.fetch_accounts(credential, since).await,
        }
    }
}

/// Shared HTTP client with a per-request timeout
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Parse a provider amount that may arrive as a JSON number or a string
pub(crate) fn parse_amount(value: &serde_json::Value) -> Option<f64> {
    let amount = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}

/// Local id of a feed account: `bank-feed:<connection>:<account>`
pub fn account_id(connection_id: &str, provider_account_id: &str) -> String {
    format!("{}{}:{}", BANK_FEED_PREFIX, connection_id, provider_account_id)
}

/// Local id of a feed transaction: `bank-feed:<connection>:<account>:<tx>`
pub fn transaction_id(connection_id: &str, provider_account_id: &str, provider_tx_id: &str) -> String {
    format!(
        "{}{}:{}:{}",
        BANK_FEED_PREFIX, connection_id, provider_account_id, provider_tx_id
    )
}

/// Components of a `bank-feed:` id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedId<'a> {
    pub connection_id: &'a str,
    pub provider_account_id: &'a str,
    /// Present for transaction ids. May itself contain `:`.
    pub provider_tx_id: Option<&'a str>,
}

pub fn parse_feed_id(id: &str) -> Option<FeedId<'_>> {
    let rest = id.strip_prefix(BANK_FEED_PREFIX)?;
    let mut parts = rest.splitn(3, ':');
    let connection_id = parts.next().filter(|s| !s.is_empty())?;
    let provider_account_id = parts.next().filter(|s| !s.is_empty())?;
    let provider_tx_id = parts.next();
    Some(FeedId {
        connection_id,
        provider_account_id,
        provider_tx_id,
    })
}

/// Whether `id` belongs to the given connection
pub fn belongs_to(id: &str, connection_id: &str) -> bool {
    parse_feed_id(id).is_some_and(|f| f.connection_id == connection_id)
}
