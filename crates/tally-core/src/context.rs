//! Engine context and ledger snapshot
//!
//! Every derivation takes an [`EngineContext`] built by the caller for that
//! request: the reference date plus configuration. A [`Ledger`] is the
//! read-only snapshot derivations run over, assembled from a record store
//! (or from plain records in tests) with the import cutoff already applied
//! and applied scenarios already expanded.

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{
    Account, AccountKind, Bank, Budget, Card, Goal, Origin, RetirementEntry, Scenario,
    Subscription, Transaction,
};
use crate::scenario;
use crate::store::RecordStore;
use crate::temporal;

/// Per-call derivation context
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Reference date: "today" for every derivation
    pub as_of: NaiveDate,
    pub config: EngineConfig,
}

impl EngineContext {
    pub fn new(as_of: NaiveDate, config: EngineConfig) -> Self {
        Self { as_of, config }
    }

    /// Context for today in the local timezone
    pub fn today(config: EngineConfig) -> Self {
        Self::new(chrono::Local::now().date_naive(), config)
    }

    pub fn import_cutoff(&self) -> NaiveDate {
        self.config.import_cutoff
    }
}

/// Raw collections as read from a store
#[derive(Debug, Clone, Default)]
pub struct LedgerRecords {
    pub transactions: Vec<Transaction>,
    pub banks: Vec<Bank>,
    pub cards: Vec<Card>,
    pub budgets: Vec<Budget>,
    pub goals: Vec<Goal>,
    pub scenarios: Vec<Scenario>,
    pub subscriptions: Vec<Subscription>,
    pub retirement: Vec<RetirementEntry>,
}

/// Immutable snapshot that derivations read
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// Allowed stored transactions followed by applied-scenario installments
    pub transactions: Vec<Transaction>,
    pub banks: Vec<Bank>,
    pub cards: Vec<Card>,
    pub budgets: Vec<Budget>,
    pub goals: Vec<Goal>,
    pub scenarios: Vec<Scenario>,
    pub subscriptions: Vec<Subscription>,
    /// Sorted by date ascending
    pub retirement: Vec<RetirementEntry>,
}

impl Ledger {
    /// Read every collection the engine derives from
    pub fn load<S: RecordStore>(store: &S, ctx: &EngineContext) -> Result<Self> {
        let records = LedgerRecords {
            transactions: store.list()?,
            banks: store.list()?,
            cards: store.list()?,
            budgets: store.list()?,
            goals: store.list()?,
            scenarios: store.list()?,
            subscriptions: store.list()?,
            retirement: store.list()?,
        };
        Ok(Self::from_records(records, ctx))
    }

    pub fn from_records(records: LedgerRecords, ctx: &EngineContext) -> Self {
        let mut transactions = temporal::ingest(records.transactions, ctx.import_cutoff());
        transactions.extend(scenario::applied_transactions(&records.scenarios));

        let mut retirement = records.retirement;
        retirement.sort_by_key(|e| e.date);

        Self {
            transactions,
            banks: records.banks,
            cards: records.cards,
            budgets: records.budgets,
            goals: records.goals,
            scenarios: records.scenarios,
            subscriptions: records.subscriptions,
            retirement,
        }
    }

    /// Transactions that exist in the store (no scenario installments)
    pub fn recorded_transactions(&self) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.origin != Origin::Synthetic)
            .cloned()
            .collect()
    }

    /// Banks first, then cards, each in store order
    pub fn accounts(&self) -> Vec<Account> {
        self.banks
            .iter()
            .cloned()
            .map(Account::Bank)
            .chain(self.cards.iter().cloned().map(Account::Card))
            .collect()
    }

    pub fn account(&self, id: &str) -> Option<Account> {
        if let Some(bank) = self.banks.iter().find(|b| b.id == id) {
            return Some(Account::Bank(bank.clone()));
        }
        self.cards
            .iter()
            .find(|c| c.id == id)
            .map(|c| Account::Card(c.clone()))
    }

    /// Kind of the account a transaction is booked against. Unknown and
    /// unassigned accounts are treated as bank-side cash.
    pub fn account_kind(&self, account_id: &str) -> AccountKind {
        if self.cards.iter().any(|c| c.id == account_id) {
            AccountKind::Card
        } else {
            AccountKind::Bank
        }
    }

    pub fn total_bank_balance(&self) -> f64 {
        self.banks.iter().map(|b| b.current_balance).sum()
    }

    pub fn total_card_debt(&self) -> f64 {
        self.cards.iter().map(|c| c.balance).sum()
    }

    pub fn total_card_limit(&self) -> f64 {
        self.cards.iter().map(|c| c.limit).sum()
    }

    pub fn active_subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter().filter(|s| s.is_active)
    }
}
