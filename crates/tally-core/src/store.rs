//! Record store abstraction
//!
//! The engine reads everything it derives from a [`RecordStore`] and the
//! reconciler and restore paths write back through it. Collections are typed
//! via the [`Record`] trait; writes that must land together go through a
//! [`WriteBatch`], which implementations commit atomically.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{
    Account, AccountPatch, Bank, BankFeedConnection, Budget, Card, Goal, RetirementEntry,
    Scenario, Subscription, Transaction, TransactionPatch, UiPreferences,
};

/// Named record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Transactions,
    Subscriptions,
    Cards,
    Banks,
    Budgets,
    Goals,
    Scenarios,
    RetirementEntries,
    BankConnections,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Subscriptions => "subscriptions",
            Self::Cards => "cards",
            Self::Banks => "banks",
            Self::Budgets => "budgets",
            Self::Goals => "goals",
            Self::Scenarios => "scenarios",
            Self::RetirementEntries => "retirementEntries",
            Self::BankConnections => "bankConnections",
        }
    }

    pub fn all() -> &'static [Collection] {
        &[
            Self::Transactions,
            Self::Subscriptions,
            Self::Cards,
            Self::Banks,
            Self::Budgets,
            Self::Goals,
            Self::Scenarios,
            Self::RetirementEntries,
            Self::BankConnections,
        ]
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A type stored in exactly one collection
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    const COLLECTION: Collection;

    fn record_id(&self) -> &str;

    /// Date used for range queries and pruning, if the record has one
    fn record_date(&self) -> Option<NaiveDate> {
        None
    }
}

impl Record for Transaction {
    const COLLECTION: Collection = Collection::Transactions;
    fn record_id(&self) -> &str {
        &self.id
    }
    fn record_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

impl Record for Subscription {
    const COLLECTION: Collection = Collection::Subscriptions;
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Card {
    const COLLECTION: Collection = Collection::Cards;
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Bank {
    const COLLECTION: Collection = Collection::Banks;
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Budget {
    const COLLECTION: Collection = Collection::Budgets;
    fn record_id(&self) -> &str {
        &self.id
    }
    fn record_date(&self) -> Option<NaiveDate> {
        Some(self.start_date)
    }
}

impl Record for Goal {
    const COLLECTION: Collection = Collection::Goals;
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for Scenario {
    const COLLECTION: Collection = Collection::Scenarios;
    fn record_id(&self) -> &str {
        &self.id
    }
    fn record_date(&self) -> Option<NaiveDate> {
        Some(self.schedule_date)
    }
}

impl Record for RetirementEntry {
    const COLLECTION: Collection = Collection::RetirementEntries;
    fn record_id(&self) -> &str {
        &self.id
    }
    fn record_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

impl Record for BankFeedConnection {
    const COLLECTION: Collection = Collection::BankConnections;
    fn record_id(&self) -> &str {
        &self.connection_id
    }
}

/// One pending write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Upsert {
        collection: Collection,
        id: String,
        date: Option<NaiveDate>,
        data: serde_json::Value,
    },
    Delete {
        collection: Collection,
        id: String,
    },
    SetUiPreferences(serde_json::Value),
}

/// Ordered set of writes committed together
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert<R: Record>(&mut self, record: &R) -> Result<()> {
        self.ops.push(WriteOp::Upsert {
            collection: R::COLLECTION,
            id: record.record_id().to_string(),
            date: record.record_date(),
            data: serde_json::to_value(record)?,
        });
        Ok(())
    }

    pub fn delete<R: Record>(&mut self, id: &str) {
        self.ops.push(WriteOp::Delete {
            collection: R::COLLECTION,
            id: id.to_string(),
        });
    }

    pub fn set_ui_preferences(&mut self, prefs: &UiPreferences) -> Result<()> {
        self.ops
            .push(WriteOp::SetUiPreferences(serde_json::to_value(prefs)?));
        Ok(())
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Storage backend for all engine records
///
/// Implementations must give read-your-writes consistency within one logical
/// operation and commit each [`WriteBatch`] atomically.
pub trait RecordStore {
    /// All records of a collection, in insertion order
    fn list<R: Record>(&self) -> Result<Vec<R>>;

    fn get<R: Record>(&self, id: &str) -> Result<Option<R>>;

    /// Returns true if a record was removed
    fn delete<R: Record>(&self, id: &str) -> Result<bool>;

    /// Commit every op in the batch, or none of them
    fn apply(&self, batch: &WriteBatch) -> Result<()>;

    /// Atomically empty `clear` and then apply `batch`
    fn replace(&self, clear: &[Collection], batch: &WriteBatch) -> Result<()>;

    fn get_ui_preferences(&self) -> Result<UiPreferences>;

    fn set_ui_preferences(&self, prefs: &UiPreferences) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.set_ui_preferences(prefs)?;
        self.apply(&batch)
    }

    fn upsert<R: Record>(&self, record: &R) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.upsert(record)?;
        self.apply(&batch)
    }

    /// Merge a validated patch onto a stored transaction
    fn update_transaction(&self, id: &str, patch: &TransactionPatch) -> Result<Transaction> {
        let mut tx = self
            .get::<Transaction>(id)?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?;
        patch.apply(&mut tx)?;
        self.upsert(&tx)?;
        Ok(tx)
    }

    /// Look up a bank or card by id
    fn get_account(&self, id: &str) -> Result<Option<Account>> {
        if let Some(bank) = self.get::<Bank>(id)? {
            return Ok(Some(Account::Bank(bank)));
        }
        Ok(self.get::<Card>(id)?.map(Account::Card))
    }

    /// Merge a validated patch onto a stored bank or card
    fn update_account(&self, id: &str, patch: &AccountPatch) -> Result<Account> {
        let mut account = self
            .get_account(id)?
            .ok_or_else(|| Error::NotFound(format!("account {}", id)))?;
        patch.apply(&mut account)?;
        match &account {
            Account::Bank(bank) => self.upsert(bank)?,
            Account::Card(card) => self.upsert(card)?,
        }
        Ok(account)
    }
}
