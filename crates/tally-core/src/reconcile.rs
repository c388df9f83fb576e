//! Bank-feed reconciliation
//!
//! Merges provider snapshots into the local ledger:
//!
//! - Accounts are insert-only. Once a feed account exists locally, its
//!   anchor balance belongs to the user and a sync never touches it.
//! - Transactions are upserted by their `bank-feed:` id, so re-running a sync
//!   converges instead of duplicating. Category, note and the recurring flag
//!   are user-owned and survive a resync.
//! - Transactions dated before the import cutoff are dropped on the way in,
//!   and stored feed rows before the cutoff are pruned.
//! - Every write of one sync lands in a single [`WriteBatch`], so a failed
//!   sync leaves the store exactly as it was.
//!
//! Syncs of the same connection are serialized through a per-connection lock;
//! different connections sync in parallel.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::EngineContext;
use crate::error::{Error, Result};
use crate::feed::{self, BankFeedProvider, FeedAccount, FeedClient, FeedTransaction};
use crate::models::{
    AccountKind, Bank, BankFeedConnection, Card, ConnectionStatus, FeedProviderKind, Origin,
    Transaction, TransactionType,
};
use crate::store::{RecordStore, WriteBatch};

/// Category given to newly imported transactions
pub const IMPORTED_CATEGORY: &str = "Imported";

/// Outcome of one successful sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub connection_id: String,
    pub accounts_inserted: usize,
    /// Feed accounts already present locally (left untouched)
    pub accounts_existing: usize,
    pub transactions_upserted: usize,
    /// Dropped before merge: malformed, duplicated or dated before the cutoff
    pub transactions_skipped: usize,
    /// Stored feed transactions removed for predating the cutoff
    pub transactions_pruned: usize,
}

/// Links connections and syncs them into a record store
///
/// The context's `as_of` stamps seeded anchors; its config supplies the
/// cutoff, timeout and seeding policy.
pub struct Reconciler<S> {
    store: S,
    ctx: EngineContext,
    /// Used for every connection instead of building one per provider
    client_override: Option<FeedClient>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S: RecordStore + Send + Sync> Reconciler<S> {
    pub fn new(store: S, ctx: EngineContext) -> Self {
        Self {
            store,
            ctx,
            client_override: None,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Use `client` for every connection (tests, mock bridges)
    pub fn with_client(store: S, ctx: EngineContext, client: FeedClient) -> Self {
        Self {
            client_override: Some(client),
            ..Self::new(store, ctx)
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn client_for(&self, provider: FeedProviderKind) -> Result<FeedClient> {
        match &self.client_override {
            Some(client) => Ok(client.clone()),
            None => FeedClient::for_kind(provider, &self.ctx.config),
        }
    }

    fn lock_for(&self, connection_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks
            .entry(connection_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn load_connection(&self, connection_id: &str) -> Result<BankFeedConnection> {
        self.store
            .get::<BankFeedConnection>(connection_id)?
            .ok_or_else(|| Error::NotFound(format!("connection {}", connection_id)))
    }

    pub fn connections(&self) -> Result<Vec<BankFeedConnection>> {
        self.store.list()
    }

    /// Claim a setup token and store a new linked connection.
    ///
    /// Nothing is persisted if the claim fails.
    pub async fn link(
        &self,
        provider: FeedProviderKind,
        setup_token: &str,
        institution_name: &str,
    ) -> Result<BankFeedConnection> {
        let client = self.client_for(provider)?;
        debug!(provider = %provider, "Linking connection");
        let credential = client.claim_access_credential(setup_token).await?;

        let connection = BankFeedConnection {
            connection_id: self.new_connection_id(provider)?,
            provider,
            access_credential: credential,
            institution_name: institution_name.trim().to_string(),
            status: ConnectionStatus::Linked,
            is_active: true,
            last_error: None,
            last_synced_at: None,
        };
        self.store.upsert(&connection)?;
        info!(connection = %connection.connection_id, provider = %provider, "Linked connection");
        Ok(connection)
    }

    /// Claim a fresh setup token for an existing connection and reactivate it
    pub async fn relink(&self, connection_id: &str, setup_token: &str) -> Result<BankFeedConnection> {
        let lock = self.lock_for(connection_id);
        let _guard = lock.lock().await;

        let mut connection = self.load_connection(connection_id)?;
        let client = self.client_for(connection.provider)?;
        connection.access_credential = client.claim_access_credential(setup_token).await?;
        connection.status = ConnectionStatus::Linked;
        connection.is_active = true;
        connection.last_error = None;
        self.store.upsert(&connection)?;
        info!(connection = %connection_id, "Relinked connection");
        Ok(connection)
    }

    /// Fetch and merge one connection.
    ///
    /// A credential failure marks the connection `Error` and inactive; it is
    /// not retried until relinked. Any other failure leaves the store as it
    /// was before the call.
    pub async fn sync(&self, connection_id: &str) -> Result<SyncReport> {
        let lock = self.lock_for(connection_id);
        let _guard = lock.lock().await;

        let mut connection = self.load_connection(connection_id)?;
        if !connection.is_active || connection.status != ConnectionStatus::Linked {
            return Err(Error::InvalidData(format!(
                "Connection {} is {} and must be relinked before syncing",
                connection_id, connection.status
            )));
        }

        let client = self.client_for(connection.provider)?;
        let cutoff = self.ctx.import_cutoff();
        let timeout = self.ctx.config.request_timeout();
        debug!(connection = %connection_id, since = %cutoff, "Syncing connection");

        let fetched = tokio::time::timeout(
            timeout,
            client.fetch_accounts(&connection.access_credential, cutoff),
        )
        .await
        .map_err(|_| Error::Timeout(timeout.as_secs()))
        .and_then(|r| r);

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_credential_failure() => {
                warn!(connection = %connection_id, error = %e, "Credential rejected, deactivating connection");
                connection.status = ConnectionStatus::Error;
                connection.is_active = false;
                connection.last_error = Some(e.to_string());
                self.store.upsert(&connection)?;
                return Err(e);
            }
            Err(e) => {
                warn!(connection = %connection_id, error = %e, "Sync failed");
                return Err(e);
            }
        };

        let mut batch = WriteBatch::new();
        let mut report = SyncReport {
            connection_id: connection_id.to_string(),
            transactions_skipped: snapshot.skipped,
            ..SyncReport::default()
        };

        let mut known_accounts: HashSet<String> = self
            .store
            .list::<Bank>()?
            .into_iter()
            .map(|b| b.id)
            .chain(self.store.list::<Card>()?.into_iter().map(|c| c.id))
            .collect();

        let stored: Vec<Transaction> = self.store.list()?;
        let existing: HashMap<&str, &Transaction> =
            stored.iter().map(|t| (t.id.as_str(), t)).collect();

        let note = provenance_note(connection.provider, &connection.institution_name);
        let mut seen = HashSet::new();

        for account in &snapshot.accounts {
            let local_id = feed::account_id(connection_id, &account.provider_account_id);
            if known_accounts.insert(local_id.clone()) {
                self.stage_account(&mut batch, &local_id, account, &connection)?;
                report.accounts_inserted += 1;
            } else {
                report.accounts_existing += 1;
            }

            for tx in &account.transactions {
                let id = feed::transaction_id(
                    connection_id,
                    &account.provider_account_id,
                    &tx.provider_tx_id,
                );
                if tx.date < cutoff || !seen.insert(id.clone()) {
                    report.transactions_skipped += 1;
                    continue;
                }
                let previous = existing.get(id.as_str()).copied();
                let merged = merge_transaction(id, &local_id, tx, previous, &note);
                batch.upsert(&merged)?;
                report.transactions_upserted += 1;
            }
        }

        // Rows merged above already carry the provider's in-window date
        for tx in &stored {
            let is_feed_row = feed::parse_feed_id(&tx.id).is_some_and(|f| f.provider_tx_id.is_some());
            if is_feed_row && tx.date < cutoff && !seen.contains(&tx.id) {
                batch.delete::<Transaction>(&tx.id);
                report.transactions_pruned += 1;
            }
        }

        connection.status = ConnectionStatus::Linked;
        connection.last_error = None;
        connection.last_synced_at = Some(Utc::now());
        batch.upsert(&connection)?;

        self.store.apply(&batch)?;
        info!(
            connection = %connection_id,
            accounts_inserted = report.accounts_inserted,
            transactions = report.transactions_upserted,
            skipped = report.transactions_skipped,
            pruned = report.transactions_pruned,
            "Sync complete"
        );
        Ok(report)
    }

    /// Sync every active connection, collecting per-connection outcomes
    pub async fn sync_all(&self) -> Result<Vec<(String, Result<SyncReport>)>> {
        let mut results = Vec::new();
        for connection in self.connections()? {
            if !connection.is_active {
                debug!(connection = %connection.connection_id, "Skipping inactive connection");
                continue;
            }
            let result = self.sync(&connection.connection_id).await;
            results.push((connection.connection_id, result));
        }
        Ok(results)
    }

    fn stage_account(
        &self,
        batch: &mut WriteBatch,
        local_id: &str,
        account: &FeedAccount,
        connection: &BankFeedConnection,
    ) -> Result<()> {
        let seed = self.ctx.config.seed_new_account_balance;
        let institution = account
            .institution
            .clone()
            .or_else(|| Some(connection.institution_name.clone()).filter(|s| !s.is_empty()));
        // A seeded anchor already reflects history up to the reference date
        let last_updated = seed.then_some(self.ctx.as_of);

        match account.kind {
            AccountKind::Bank => batch.upsert(&Bank {
                id: local_id.to_string(),
                name: account.name.clone(),
                institution,
                current_balance: if seed { account.balance } else { 0.0 },
                available_balance: if seed { account.available_balance } else { None },
                apy: None,
                last_updated,
            }),
            AccountKind::Card => batch.upsert(&Card {
                id: local_id.to_string(),
                name: account.name.clone(),
                institution,
                balance: if seed { account.balance } else { 0.0 },
                limit: account.limit.unwrap_or(0.0).max(0.0),
                apr: None,
                last_updated,
            }),
        }
    }

    /// `<provider>-<timestamp>`, suffixed if that id is taken
    fn new_connection_id(&self, provider: FeedProviderKind) -> Result<String> {
        let base = format!("{}-{}", provider.as_str(), Utc::now().format("%Y%m%d%H%M%S%3f"));
        let mut candidate = base.clone();
        let mut n = 1;
        while self.store.get::<BankFeedConnection>(&candidate)?.is_some() {
            n += 1;
            candidate = format!("{}-{}", base, n);
        }
        Ok(candidate)
    }
}

pub(crate) fn provenance_note(provider: FeedProviderKind, institution: &str) -> String {
    if institution.is_empty() {
        format!("Imported from {}", provider.label())
    } else {
        format!("Imported from {} ({})", provider.label(), institution)
    }
}

/// Build the stored form of a feed transaction, keeping user-owned fields
/// from a previous import
fn merge_transaction(
    id: String,
    account: &str,
    tx: &FeedTransaction,
    previous: Option<&Transaction>,
    note: &str,
) -> Transaction {
    let kind = if tx.amount < 0.0 {
        TransactionType::Expense
    } else {
        TransactionType::Income
    };

    let (category, note, recurring) = match previous {
        Some(p) => (p.category.clone(), p.note.clone(), p.recurring),
        None => (IMPORTED_CATEGORY.to_string(), note.to_string(), false),
    };

    Transaction {
        id,
        date: tx.date,
        amount: tx.amount.abs(),
        kind,
        category,
        merchant: tx.description.trim().to_string(),
        account: account.to_string(),
        note,
        recurring,
        origin: Origin::Imported,
    }
}
