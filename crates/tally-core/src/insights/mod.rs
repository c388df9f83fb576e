//! Insight Engine - rule-based financial insights
//!
//! A fixed cascade of rules runs over the ledger in order, and every rule
//! that matches contributes findings:
//!
//! 1. **Budget alerts** - overspent and almost-at-limit budgets
//! 2. **Spending anomaly** - category spend far above its rolling average
//! 3. **Savings streak** - consecutive months with positive savings
//! 4. **Savings opportunity** - frequent merchants with large totals
//! 5. **Data tips** - getting-started hints when data is sparse
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_core::insights::generate_insights;
//!
//! let ledger = Ledger::load(&db, &ctx)?;
//! let findings = generate_insights(&ledger, &ctx);
//! ```

pub mod budget_alerts;
pub mod data_tips;
pub mod engine;
pub mod savings_opportunity;
pub mod savings_streak;
pub mod spending_anomaly;
pub mod types;

pub use budget_alerts::BudgetAlertInsight;
pub use data_tips::DataTipInsight;
pub use engine::{generate_insights, AnalysisContext, Insight, InsightEngine};
pub use savings_opportunity::{MerchantSpend, SavingsOpportunityInsight};
pub use savings_streak::SavingsStreakInsight;
pub use spending_anomaly::SpendingAnomalyInsight;
pub use types::{Finding, InsightType, Severity};
