//! Tally Core Library
//!
//! Ledger derivation and bank-feed reconciliation for the Tally personal
//! finance tool:
//! - Record store abstraction with an encrypted SQLite implementation
//! - Temporal classification (posted, scheduled, imported, cutoff)
//! - Live balances, cashflow, net worth and budget status
//! - Goal progress and the composite financial health score
//! - Rule-based insight cascade
//! - What-if scenario projection
//! - Plaid and SimpleFIN bank-feed providers and the reconciler
//! - Versioned backup export and restore

pub mod backup;
pub mod balance;
pub mod budget;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod feed;
pub mod goals;
pub mod health;
pub mod insights;
pub mod models;
pub mod net_worth;
pub mod reconcile;
pub mod scenario;
pub mod store;
pub mod summary;
pub mod temporal;

/// Test utilities including a mock SimpleFIN bridge
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use backup::{export_backup, parse_backup, restore_backup, BackupData, BackupEnvelope};
pub use balance::{live_balances, pending_impact, LiveBalance, PendingImpact};
pub use budget::{
    budget_statuses, category_anomalies, spending_forecast, BudgetStatus, CategoryAnomaly,
    PeriodWindow, SpendingForecast,
};
pub use config::{EngineConfig, InsightConfig};
pub use context::{EngineContext, Ledger, LedgerRecords};
pub use db::Database;
pub use error::{Error, Result};
pub use feed::{BankFeedProvider, FeedClient, FeedSnapshot, MockProvider, MockResponse};
pub use goals::{all_goal_progress, GoalProgress};
pub use health::{health_score, HealthRating, HealthScore};
pub use insights::{generate_insights, Finding, InsightEngine, InsightType, Severity};
pub use net_worth::{net_worth_timeline, NetWorthPoint};
pub use reconcile::{Reconciler, SyncReport};
pub use scenario::{evaluate_scenario, ScenarioBaseline, ScenarioEvaluation};
pub use store::{Collection, Record, RecordStore, WriteBatch};
pub use summary::{cashflow_summary, monthly_cashflow, CashflowSummary, MonthlyCashflow};
