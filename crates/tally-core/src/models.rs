//! Domain models for Tally
//!
//! Records use camelCase on the wire so stored payloads and backups stay
//! compatible with the JSON the rest of the app reads and writes.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Id prefix that marks records created by the bank-feed reconciler
pub const BANK_FEED_PREFIX: &str = "bank-feed:";

/// Note marker written on imported transactions
pub const IMPORTED_NOTE_MARKER: &str = "imported from";

/// Account id used for transactions not attached to any account
pub const UNASSIGNED_ACCOUNT: &str = "unassigned";

/// Income or expense. Amounts are always non-negative; the type carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a transaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Entered by the user
    #[default]
    Manual,
    /// Merged in from a bank feed
    Imported,
    /// Generated from an applied what-if scenario (never persisted)
    Synthetic,
}

impl Origin {
    /// Classify a stored record from its wire-level provenance signals:
    /// the `bank-feed:` id prefix, or an "imported from" note.
    pub fn detect(id: &str, note: &str) -> Self {
        if id.starts_with(BANK_FEED_PREFIX)
            || note.to_lowercase().contains(IMPORTED_NOTE_MARKER)
        {
            Self::Imported
        } else {
            Self::Manual
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Imported => "imported",
            Self::Synthetic => "synthetic",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    /// Always >= 0; `kind` carries the direction
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    #[serde(default)]
    pub merchant: String,
    /// Bank or card id, or `unassigned`
    #[serde(default = "unassigned")]
    pub account: String,
    #[serde(default)]
    pub note: String,
    #[serde(default, rename = "recurringFlag")]
    pub recurring: bool,
    /// Derived at ingestion; stored copies are re-classified on load
    #[serde(default)]
    pub origin: Origin,
}

fn unassigned() -> String {
    UNASSIGNED_ACCOUNT.to_string()
}

impl Transaction {
    /// Signed effect on a bank-style balance: +amount for income, -amount for expense
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }
}

/// A bank (deposit) account. `current_balance` is the anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub institution: Option<String>,
    pub current_balance: f64,
    #[serde(default)]
    pub available_balance: Option<f64>,
    /// Annual percentage yield
    #[serde(default)]
    pub apy: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<NaiveDate>,
}

/// A credit card. `balance` is the anchor (amount owed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub institution: Option<String>,
    pub balance: f64,
    #[serde(default)]
    pub limit: f64,
    /// Annual percentage rate
    #[serde(default)]
    pub apr: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<NaiveDate>,
}

/// Account kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Bank,
    Card,
}

/// Either kind of account, for code that treats them uniformly
#[derive(Debug, Clone, PartialEq)]
pub enum Account {
    Bank(Bank),
    Card(Card),
}

impl Account {
    pub fn id(&self) -> &str {
        match self {
            Self::Bank(b) => &b.id,
            Self::Card(c) => &c.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Bank(b) => &b.name,
            Self::Card(c) => &c.name,
        }
    }

    pub fn kind(&self) -> AccountKind {
        match self {
            Self::Bank(_) => AccountKind::Bank,
            Self::Card(_) => AccountKind::Card,
        }
    }

    /// Stored anchor: bank balance, or amount owed on a card
    pub fn anchor_balance(&self) -> f64 {
        match self {
            Self::Bank(b) => b.current_balance,
            Self::Card(c) => c.balance,
        }
    }
}

/// Budget period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A spending budget for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub category: String,
    pub amount: f64,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GoalKind {
    #[default]
    Savings,
    DebtPayoff,
    Purchase,
}

/// A savings or debt-payoff goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: GoalKind,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    /// Bank or card whose balance drives `current_amount`
    #[serde(default)]
    pub linked_account: Option<String>,
    /// Debt owed when a payoff goal was created
    #[serde(default)]
    pub starting_amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cash,
    Card,
}

/// A hypothetical purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub duration_months: i32,
    pub payment_type: PaymentType,
    pub schedule_date: NaiveDate,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub is_applied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Multiplier that converts one charge into a monthly amount
    pub fn monthly_factor(&self) -> f64 {
        match self {
            Self::Weekly => 52.0 / 12.0,
            Self::Monthly => 1.0,
            Self::Yearly => 1.0 / 12.0,
        }
    }
}

/// A recurring subscription charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub frequency: Frequency,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Subscription {
    pub fn monthly_cost(&self) -> f64 {
        self.amount * self.frequency.monthly_factor()
    }
}

/// A point-in-time retirement account balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementEntry {
    pub id: String,
    pub date: NaiveDate,
    pub balance: f64,
    #[serde(default)]
    pub contribution: Option<f64>,
}

/// Supported bank-feed providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedProviderKind {
    Plaid,
    SimpleFin,
}

impl FeedProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaid => "plaid",
            Self::SimpleFin => "simplefin",
        }
    }

    /// Display name used in provenance notes
    pub fn label(&self) -> &'static str {
        match self {
            Self::Plaid => "Plaid",
            Self::SimpleFin => "SimpleFIN",
        }
    }
}

impl std::str::FromStr for FeedProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plaid" => Ok(Self::Plaid),
            "simplefin" | "simple_fin" => Ok(Self::SimpleFin),
            _ => Err(format!("Unknown feed provider: {}", s)),
        }
    }
}

impl std::fmt::Display for FeedProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted lifecycle state of a bank-feed connection
///
/// `Linking` and `Syncing` are transient and only exist while the reconciler
/// holds the connection's lock; they are never written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Unlinked,
    Linked,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unlinked => "unlinked",
            Self::Linked => "linked",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A linked bank-feed connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankFeedConnection {
    pub connection_id: String,
    pub provider: FeedProviderKind,
    pub access_credential: String,
    #[serde(default)]
    pub institution_name: String,
    #[serde(default)]
    pub status: ConnectionStatus,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Free-form UI preferences, stored opaquely
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiPreferences {
    #[serde(flatten)]
    pub values: BTreeMap<String, serde_json::Value>,
}

/// Partial update for a transaction, validated before it is merged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub category: Option<String>,
    pub merchant: Option<String>,
    pub account: Option<String>,
    pub note: Option<String>,
    #[serde(rename = "recurringFlag")]
    pub recurring: Option<bool>,
}

impl TransactionPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.amount {
            if !amount.is_finite() || amount < 0.0 {
                return Err(Error::InvalidData(format!(
                    "Transaction amount must be a non-negative number, got {}",
                    amount
                )));
            }
        }
        if let Some(ref category) = self.category {
            if category.trim().is_empty() {
                return Err(Error::InvalidData("Category cannot be empty".into()));
            }
        }
        if let Some(ref account) = self.account {
            if account.trim().is_empty() {
                return Err(Error::InvalidData("Account cannot be empty".into()));
            }
        }
        Ok(())
    }

    /// Validate, then merge onto `tx`
    pub fn apply(&self, tx: &mut Transaction) -> Result<()> {
        self.validate()?;
        if let Some(date) = self.date {
            tx.date = date;
        }
        if let Some(amount) = self.amount {
            tx.amount = amount;
        }
        if let Some(kind) = self.kind {
            tx.kind = kind;
        }
        if let Some(ref category) = self.category {
            tx.category = category.trim().to_string();
        }
        if let Some(ref merchant) = self.merchant {
            tx.merchant = merchant.clone();
        }
        if let Some(ref account) = self.account {
            tx.account = account.trim().to_string();
        }
        if let Some(ref note) = self.note {
            tx.note = note.clone();
        }
        if let Some(recurring) = self.recurring {
            tx.recurring = recurring;
        }
        Ok(())
    }
}

/// Partial update for a bank or card. Only the user sets anchors this way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPatch {
    pub name: Option<String>,
    /// New anchor: `currentBalance` for banks, `balance` for cards
    pub balance: Option<f64>,
    pub available_balance: Option<f64>,
    pub limit: Option<f64>,
    pub apr: Option<f64>,
    pub apy: Option<f64>,
    pub last_updated: Option<NaiveDate>,
}

impl AccountPatch {
    pub fn validate(&self, kind: AccountKind) -> Result<()> {
        let finite = [
            ("balance", self.balance),
            ("availableBalance", self.available_balance),
            ("limit", self.limit),
            ("apr", self.apr),
            ("apy", self.apy),
        ];
        for (field, value) in finite {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(Error::InvalidData(format!("{} must be finite", field)));
                }
            }
        }
        if let Some(limit) = self.limit {
            if kind != AccountKind::Card {
                return Err(Error::InvalidData("Only cards have a limit".into()));
            }
            if limit < 0.0 {
                return Err(Error::InvalidData("Card limit cannot be negative".into()));
            }
        }
        if self.apr.is_some() && kind != AccountKind::Card {
            return Err(Error::InvalidData("Only cards have an APR".into()));
        }
        if (self.apy.is_some() || self.available_balance.is_some()) && kind != AccountKind::Bank {
            return Err(Error::InvalidData(
                "APY and available balance only apply to banks".into(),
            ));
        }
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err(Error::InvalidData("Account name cannot be empty".into()));
            }
        }
        Ok(())
    }

    pub fn apply(&self, account: &mut Account) -> Result<()> {
        self.validate(account.kind())?;
        match account {
            Account::Bank(bank) => {
                if let Some(ref name) = self.name {
                    bank.name = name.trim().to_string();
                }
                if let Some(balance) = self.balance {
                    bank.current_balance = balance;
                }
                if self.available_balance.is_some() {
                    bank.available_balance = self.available_balance;
                }
                if self.apy.is_some() {
                    bank.apy = self.apy;
                }
                if self.last_updated.is_some() {
                    bank.last_updated = self.last_updated;
                }
            }
            Account::Card(card) => {
                if let Some(ref name) = self.name {
                    card.name = name.trim().to_string();
                }
                if let Some(balance) = self.balance {
                    card.balance = balance;
                }
                if let Some(limit) = self.limit {
                    card.limit = limit;
                }
                if self.apr.is_some() {
                    card.apr = self.apr;
                }
                if self.last_updated.is_some() {
                    card.last_updated = self.last_updated;
                }
            }
        }
        Ok(())
    }
}
