//! Scenario projector
//!
//! An applied scenario becomes a run of monthly installment transactions that
//! are unioned into the derivation stream. They carry `Origin::Synthetic`,
//! are never written to the store, and never take part in bank-feed logic.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::context::{EngineContext, Ledger};
use crate::models::{Origin, PaymentType, Scenario, Transaction, TransactionType, UNASSIGNED_ACCOUNT};
use crate::summary;

pub const SCENARIO_CATEGORY: &str = "What-If Scenario";

/// Longest installment run a scenario expands to (30 years)
pub const MAX_INSTALLMENT_MONTHS: i32 = 360;

/// Number of installments and the amount of each
///
/// Durations past [`MAX_INSTALLMENT_MONTHS`] are clamped, and the amount is
/// spread over the clamped run so the installments still sum to it.
pub fn installment_plan(scenario: &Scenario) -> (u32, f64) {
    if scenario.duration_months <= 0 {
        (1, scenario.amount)
    } else {
        let n = scenario.duration_months.min(MAX_INSTALLMENT_MONTHS) as u32;
        (n, scenario.amount / n as f64)
    }
}

/// Synthesize the installment transactions for one scenario, applied or not
pub fn installments(scenario: &Scenario) -> Vec<Transaction> {
    let (count, each) = installment_plan(scenario);
    let account = scenario
        .account_id
        .clone()
        .unwrap_or_else(|| UNASSIGNED_ACCOUNT.to_string());

    (0..count)
        .filter_map(|i| {
            let date = scenario.schedule_date.checked_add_months(Months::new(i))?;
            Some(Transaction {
                id: format!("scenario:{}:{}", scenario.id, i + 1),
                date,
                amount: each,
                kind: TransactionType::Expense,
                category: SCENARIO_CATEGORY.to_string(),
                merchant: scenario.name.clone(),
                account: account.clone(),
                note: format!("What-if installment {}/{}", i + 1, count),
                recurring: count > 1,
                origin: Origin::Synthetic,
            })
        })
        .collect()
}

/// Installments for every applied scenario
pub fn applied_transactions(scenarios: &[Scenario]) -> Vec<Transaction> {
    scenarios
        .iter()
        .filter(|s| s.is_applied)
        .flat_map(installments)
        .collect()
}

/// Inputs a scenario is measured against, taken from the ledger without any
/// synthetic transactions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScenarioBaseline {
    pub net_cashflow: f64,
    pub monthly_subscriptions: f64,
    pub current_card_debt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioMonth {
    pub month: NaiveDate,
    pub payment: f64,
    pub disposable: f64,
    pub debt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioEvaluation {
    pub scenario_id: String,
    pub baseline_disposable: f64,
    pub monthly_scenario_cost: f64,
    pub projected_disposable_after_purchase: f64,
    pub projected_debt: f64,
    /// One entry per installment month
    pub trajectory: Vec<ScenarioMonth>,
}

impl ScenarioBaseline {
    /// Month-to-date baseline with every scenario installment stripped out
    pub fn from_ledger(ledger: &Ledger, ctx: &EngineContext) -> Self {
        let recorded = Ledger {
            transactions: ledger.recorded_transactions(),
            ..ledger.clone()
        };
        let cashflow = summary::cashflow_summary(&recorded, ctx);
        Self {
            net_cashflow: cashflow.net_cashflow,
            monthly_subscriptions: cashflow.monthly_subscription_cost,
            current_card_debt: cashflow.total_card_debt,
        }
    }
}

/// Measure a scenario against the baseline, whether or not it is applied
pub fn evaluate_scenario(scenario: &Scenario, baseline: &ScenarioBaseline) -> ScenarioEvaluation {
    let (count, monthly_cost) = installment_plan(scenario);
    let baseline_disposable = baseline.net_cashflow - baseline.monthly_subscriptions;
    let on_card = scenario.payment_type == PaymentType::Card;
    let projected_debt = baseline.current_card_debt + if on_card { scenario.amount } else { 0.0 };

    let trajectory = (0..count)
        .filter_map(|i| {
            let month = scenario.schedule_date.checked_add_months(Months::new(i))?;
            let paid = monthly_cost * (i + 1) as f64;
            let debt = if on_card {
                baseline.current_card_debt + (scenario.amount - paid).max(0.0)
            } else {
                baseline.current_card_debt
            };
            Some(ScenarioMonth {
                month,
                payment: monthly_cost,
                disposable: baseline_disposable - monthly_cost,
                debt,
            })
        })
        .collect();

    ScenarioEvaluation {
        scenario_id: scenario.id.clone(),
        baseline_disposable,
        monthly_scenario_cost: monthly_cost,
        projected_disposable_after_purchase: baseline_disposable - monthly_cost,
        projected_debt,
        trajectory,
    }
}
