//! Budget & variance engine
//!
//! Budget windows, spend-to-date and pace, trailing category averages,
//! anomalies, and next-month forecasts. Categories are reported in the order
//! they first appear in the ledger so output is deterministic.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::context::{EngineContext, Ledger};
use crate::models::{Budget, BudgetPeriod, Transaction};
use crate::summary::percent;
use crate::temporal;

/// Half-open `[start, end)` window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Window of `period` containing `as_of`. Weeks start on Sunday.
pub fn period_window(period: BudgetPeriod, as_of: NaiveDate) -> PeriodWindow {
    match period {
        BudgetPeriod::Weekly => {
            let start = as_of - Duration::days(as_of.weekday().num_days_from_sunday() as i64);
            PeriodWindow {
                start,
                end: start + Duration::days(7),
            }
        }
        BudgetPeriod::Monthly => {
            let start = temporal::month_start(as_of);
            PeriodWindow {
                start,
                end: temporal::shift_month(start, 1),
            }
        }
        BudgetPeriod::Yearly => {
            let start = NaiveDate::from_ymd_opt(as_of.year(), 1, 1).unwrap_or(as_of);
            let end = NaiveDate::from_ymd_opt(as_of.year() + 1, 1, 1).unwrap_or(as_of);
            PeriodWindow { start, end }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub budget_id: String,
    pub category: String,
    pub period: BudgetPeriod,
    pub window: PeriodWindow,
    pub amount: f64,
    pub spent: f64,
    pub remaining: f64,
    pub pct_used: f64,
    /// Fraction of the window elapsed, counting today, in `[0, 1]`
    pub pct_elapsed: f64,
    pub on_track: bool,
}

/// Spend-to-date and pace for one budget as of `as_of`
pub fn budget_status(budget: &Budget, transactions: &[Transaction], as_of: NaiveDate) -> BudgetStatus {
    let window = period_window(budget.period, as_of);
    let spent: f64 = transactions
        .iter()
        .filter(|t| {
            t.is_expense()
                && t.category == budget.category
                && window.contains(t.date)
                && temporal::is_posted(t, as_of)
        })
        .map(|t| t.amount)
        .sum();

    let pct_used = percent(spent, budget.amount);
    let days_elapsed = ((as_of - window.start).num_days() + 1).clamp(0, window.days());
    let pct_elapsed = if window.days() > 0 {
        days_elapsed as f64 / window.days() as f64
    } else {
        0.0
    };

    BudgetStatus {
        budget_id: budget.id.clone(),
        category: budget.category.clone(),
        period: budget.period,
        window,
        amount: budget.amount,
        spent,
        remaining: (budget.amount - spent).max(0.0),
        pct_used,
        pct_elapsed,
        on_track: pct_used <= pct_elapsed * 100.0,
    }
}

/// Status of every active budget that has started by the reference date
pub fn budget_statuses(ledger: &Ledger, ctx: &EngineContext) -> Vec<BudgetStatus> {
    ledger
        .budgets
        .iter()
        .filter(|b| b.is_active && b.start_date <= ctx.as_of)
        .map(|b| budget_status(b, &ledger.transactions, ctx.as_of))
        .collect()
}

/// Totals keyed by name, iterated in first-insertion order
#[derive(Debug, Clone, Default)]
pub(crate) struct OrderedTotals {
    order: Vec<String>,
    totals: HashMap<String, f64>,
}

impl OrderedTotals {
    pub(crate) fn add(&mut self, key: &str, amount: f64) {
        match self.totals.get_mut(key) {
            Some(total) => *total += amount,
            None => {
                self.order.push(key.to_string());
                self.totals.insert(key.to_string(), amount);
            }
        }
    }

    pub(crate) fn get(&self, key: &str) -> f64 {
        self.totals.get(key).copied().unwrap_or(0.0)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.order.iter().map(|k| (k.as_str(), self.get(k)))
    }
}

fn category_spend(
    transactions: &[Transaction],
    start: NaiveDate,
    end_exclusive: NaiveDate,
) -> OrderedTotals {
    let mut totals = OrderedTotals::default();
    for t in transactions
        .iter()
        .filter(|t| t.is_expense() && t.date >= start && t.date < end_exclusive)
    {
        totals.add(&t.category, t.amount);
    }
    totals
}

/// Mean monthly expense per category over the `window_months` calendar
/// months strictly before `reference_month`
pub fn rolling_category_averages(
    transactions: &[Transaction],
    reference_month: NaiveDate,
    window_months: u32,
) -> Vec<(String, f64)> {
    if window_months == 0 {
        return Vec::new();
    }
    let end = temporal::month_start(reference_month);
    let start = temporal::shift_month(end, -(window_months as i32));
    category_spend(transactions, start, end)
        .iter()
        .map(|(category, total)| (category.to_string(), total / window_months as f64))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAnomaly {
    pub category: String,
    pub current: f64,
    pub rolling_average: f64,
    /// `current / rolling_average`
    pub ratio: f64,
}

/// Month-to-date category spend that exceeds the rolling average by the
/// configured multiplier
pub fn category_anomalies(ledger: &Ledger, ctx: &EngineContext) -> Vec<CategoryAnomaly> {
    let settings = &ctx.config.insights;
    let month = temporal::month_start(ctx.as_of);
    let posted: Vec<Transaction> = temporal::posted(&ledger.transactions, ctx.as_of)
        .cloned()
        .collect();

    let averages: HashMap<String, f64> =
        rolling_category_averages(&posted, month, settings.rolling_window_months)
            .into_iter()
            .collect();
    let current = category_spend(&posted, month, temporal::shift_month(month, 1));

    current
        .iter()
        .filter_map(|(category, spent)| {
            let avg = averages.get(category).copied().unwrap_or(0.0);
            (avg > 0.0 && spent > avg * settings.anomaly_multiplier).then(|| CategoryAnomaly {
                category: category.to_string(),
                current: spent,
                rolling_average: avg,
                ratio: spent / avg,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingForecast {
    /// First day of the forecast month
    pub month: NaiveDate,
    pub categories: Vec<(String, f64)>,
    pub total: f64,
}

/// Next month's expected spend per category, taken as the rolling average
/// of the full months before the current one
pub fn spending_forecast(ledger: &Ledger, ctx: &EngineContext) -> SpendingForecast {
    let posted: Vec<Transaction> = temporal::posted(&ledger.transactions, ctx.as_of)
        .cloned()
        .collect();
    let categories = rolling_category_averages(
        &posted,
        ctx.as_of,
        ctx.config.insights.rolling_window_months,
    );
    SpendingForecast {
        month: temporal::shift_month(ctx.as_of, 1),
        total: categories.iter().map(|(_, v)| v).sum(),
        categories,
    }
}
