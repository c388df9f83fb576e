//! Cashflow summaries
//!
//! Cashflow is cash-basis: only posted transactions booked against bank or
//! unassigned accounts count. Card activity moves debt, not cash, and shows
//! up through card balances and utilization instead.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::context::{EngineContext, Ledger};
use crate::models::{AccountKind, Subscription, Transaction};
use crate::temporal;

/// `part / whole * 100`, or 0 when `whole` is not a positive number
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 && whole.is_finite() && part.is_finite() {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Active subscriptions normalized to a monthly amount
pub fn monthly_subscription_cost<'a>(subs: impl IntoIterator<Item = &'a Subscription>) -> f64 {
    subs.into_iter()
        .filter(|s| s.is_active)
        .map(Subscription::monthly_cost)
        .sum()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowSummary {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_cashflow: f64,
    pub monthly_subscription_cost: f64,
    pub total_bank_balance: f64,
    pub total_card_debt: f64,
    pub total_card_limit: f64,
    pub credit_utilization: f64,
}

fn is_cash(ledger: &Ledger, tx: &Transaction) -> bool {
    ledger.account_kind(&tx.account) == AccountKind::Bank
}

/// Cash income and expenses over `[start, end]`, posted as of `as_of`
pub fn cashflow_between(
    ledger: &Ledger,
    start: NaiveDate,
    end: NaiveDate,
    as_of: NaiveDate,
) -> (f64, f64) {
    temporal::posted(&ledger.transactions, as_of)
        .filter(|t| t.date >= start && t.date <= end && is_cash(ledger, t))
        .fold((0.0, 0.0), |(income, expenses), t| {
            if t.is_income() {
                (income + t.amount, expenses)
            } else {
                (income, expenses + t.amount)
            }
        })
}

/// Month-to-date cashflow plus the current account totals
pub fn cashflow_summary(ledger: &Ledger, ctx: &EngineContext) -> CashflowSummary {
    let period_start = temporal::month_start(ctx.as_of);
    let (total_income, total_expenses) =
        cashflow_between(ledger, period_start, ctx.as_of, ctx.as_of);
    let total_card_debt = ledger.total_card_debt();
    let total_card_limit = ledger.total_card_limit();

    CashflowSummary {
        period_start,
        period_end: ctx.as_of,
        total_income,
        total_expenses,
        net_cashflow: total_income - total_expenses,
        monthly_subscription_cost: monthly_subscription_cost(&ledger.subscriptions),
        total_bank_balance: ledger.total_bank_balance(),
        total_card_debt,
        total_card_limit,
        credit_utilization: percent(total_card_debt, total_card_limit),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCashflow {
    /// First day of the month
    pub month: NaiveDate,
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
}

/// One entry per calendar month from the earliest posted cash transaction
/// through the reference month, gaps filled with zeros
pub fn monthly_cashflow(ledger: &Ledger, ctx: &EngineContext) -> Vec<MonthlyCashflow> {
    let cash: Vec<&Transaction> = temporal::posted(&ledger.transactions, ctx.as_of)
        .filter(|t| is_cash(ledger, t))
        .collect();

    let Some(first) = cash.iter().map(|t| t.date).min() else {
        return Vec::new();
    };

    let first_month = temporal::month_start(first);
    let months = temporal::months_between(first_month, ctx.as_of).max(0) + 1;
    let mut series: Vec<MonthlyCashflow> = (0..months)
        .map(|i| MonthlyCashflow {
            month: temporal::shift_month(first_month, i),
            income: 0.0,
            expenses: 0.0,
            net: 0.0,
        })
        .collect();

    for t in cash {
        let idx = temporal::months_between(first_month, t.date) as usize;
        if let Some(entry) = series.get_mut(idx) {
            if t.is_income() {
                entry.income += t.amount;
            } else {
                entry.expenses += t.amount;
            }
        }
    }
    for entry in &mut series {
        entry.net = entry.income - entry.expenses;
    }
    series
}
