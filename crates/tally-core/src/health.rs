//! Financial health score
//!
//! Five metrics are each normalized onto `[0, 100]` by linear interpolation
//! between a "good" and a "fair" threshold, then combined with fixed
//! weights. Direction comes from the thresholds: when `good > fair`, higher
//! values are better.

use chrono::Months;
use serde::{Deserialize, Serialize};

use crate::context::{EngineContext, Ledger};
use crate::models::RetirementEntry;
use crate::summary::{self, percent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthMetricKind {
    SavingsRate,
    CreditUtilization,
    DebtToIncome,
    CashReserve,
    RetirementGrowth,
}

impl HealthMetricKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SavingsRate => "Savings rate",
            Self::CreditUtilization => "Credit utilization",
            Self::DebtToIncome => "Debt-to-income",
            Self::CashReserve => "Cash reserve",
            Self::RetirementGrowth => "Retirement growth",
        }
    }

    /// (good, fair, weight)
    pub fn thresholds(&self) -> (f64, f64, f64) {
        match self {
            Self::SavingsRate => (20.0, 0.0, 0.25),
            Self::CreditUtilization => (30.0, 80.0, 0.20),
            Self::DebtToIncome => (20.0, 50.0, 0.20),
            Self::CashReserve => (3.0, 0.0, 0.20),
            Self::RetirementGrowth => (7.0, 0.0, 0.15),
        }
    }
}

/// Overall band for the combined score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthRating {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            40..=59 => Self::Fair,
            _ => Self::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

/// Per-metric display rating; uses its own cut points, not the overall bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricRating {
    Good,
    Fair,
    Poor,
}

impl MetricRating {
    pub fn from_normalized(normalized: f64) -> Self {
        if normalized >= 70.0 {
            Self::Good
        } else if normalized >= 40.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthMetric {
    pub kind: HealthMetricKind,
    pub value: f64,
    pub normalized: f64,
    pub weight: f64,
    pub rating: MetricRating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthScore {
    pub score: u32,
    pub rating: HealthRating,
    pub metrics: Vec<HealthMetric>,
}

/// Raw metric values before normalization
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HealthInputs {
    pub savings_rate: f64,
    pub credit_utilization: f64,
    pub debt_to_income: f64,
    pub cash_reserve_months: f64,
    pub retirement_growth: f64,
}

/// Map `value` onto `[0, 100]` between `fair` (0) and `good` (100)
pub fn normalize(value: f64, good: f64, fair: f64) -> f64 {
    if !value.is_finite() || good == fair {
        return 0.0;
    }
    let scaled = (value - fair) / (good - fair) * 100.0;
    scaled.clamp(0.0, 100.0)
}

pub fn score_inputs(inputs: &HealthInputs) -> HealthScore {
    let values = [
        (HealthMetricKind::SavingsRate, inputs.savings_rate),
        (HealthMetricKind::CreditUtilization, inputs.credit_utilization),
        (HealthMetricKind::DebtToIncome, inputs.debt_to_income),
        (HealthMetricKind::CashReserve, inputs.cash_reserve_months),
        (HealthMetricKind::RetirementGrowth, inputs.retirement_growth),
    ];

    let metrics: Vec<HealthMetric> = values
        .into_iter()
        .map(|(kind, value)| {
            let (good, fair, weight) = kind.thresholds();
            let normalized = normalize(value, good, fair);
            HealthMetric {
                kind,
                value,
                normalized,
                weight,
                rating: MetricRating::from_normalized(normalized),
            }
        })
        .collect();

    let weighted: f64 = metrics.iter().map(|m| m.normalized * m.weight).sum();
    let score = weighted.round().clamp(0.0, 100.0) as u32;

    HealthScore {
        score,
        rating: HealthRating::from_score(score),
        metrics,
    }
}

/// Annualized growth (%) across the entries of the trailing year ending at
/// the latest entry. `entries` must be sorted by date.
pub fn retirement_growth(entries: &[RetirementEntry]) -> f64 {
    let Some(latest) = entries.last() else {
        return 0.0;
    };
    let window_start = latest
        .date
        .checked_sub_months(Months::new(12))
        .unwrap_or(latest.date);
    let Some(base) = entries.iter().find(|e| e.date >= window_start) else {
        return 0.0;
    };

    let days = (latest.date - base.date).num_days();
    if days <= 0 || base.balance <= 0.0 {
        return 0.0;
    }
    let growth = percent(latest.balance - base.balance, base.balance);
    growth * 365.0 / days as f64
}

/// Gather the raw metrics from the ledger. Income-based ratios use the
/// month-to-date cashflow.
pub fn health_inputs(ledger: &Ledger, ctx: &EngineContext) -> HealthInputs {
    let cashflow = summary::cashflow_summary(ledger, ctx);
    let income = cashflow.total_income;

    HealthInputs {
        savings_rate: percent(cashflow.net_cashflow, income),
        credit_utilization: cashflow.credit_utilization,
        debt_to_income: percent(cashflow.total_card_debt, income * 12.0),
        cash_reserve_months: if income > 0.0 {
            cashflow.total_bank_balance / income
        } else {
            0.0
        },
        retirement_growth: retirement_growth(&ledger.retirement),
    }
}

pub fn health_score(ledger: &Ledger, ctx: &EngineContext) -> HealthScore {
    score_inputs(&health_inputs(ledger, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::test_support::date;

    fn entry(d: chrono::NaiveDate, balance: f64) -> RetirementEntry {
        RetirementEntry {
            id: d.to_string(),
            date: d,
            balance,
            contribution: None,
        }
    }

    #[test]
    fn test_normalize_direction() {
        // Higher is better
        assert_eq!(normalize(20.0, 20.0, 0.0), 100.0);
        assert_eq!(normalize(10.0, 20.0, 0.0), 50.0);
        assert_eq!(normalize(-5.0, 20.0, 0.0), 0.0);
        // Lower is better
        assert_eq!(normalize(30.0, 30.0, 80.0), 100.0);
        assert_eq!(normalize(55.0, 30.0, 80.0), 50.0);
        assert_eq!(normalize(95.0, 30.0, 80.0), 0.0);
        assert_eq!(normalize(f64::NAN, 30.0, 80.0), 0.0);
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(HealthRating::from_score(100), HealthRating::Excellent);
        assert_eq!(HealthRating::from_score(80), HealthRating::Excellent);
        assert_eq!(HealthRating::from_score(79), HealthRating::Good);
        assert_eq!(HealthRating::from_score(60), HealthRating::Good);
        assert_eq!(HealthRating::from_score(40), HealthRating::Fair);
        assert_eq!(HealthRating::from_score(39), HealthRating::Poor);
        assert_eq!(MetricRating::from_normalized(70.0), MetricRating::Good);
        assert_eq!(MetricRating::from_normalized(69.9), MetricRating::Fair);
        assert_eq!(MetricRating::from_normalized(39.9), MetricRating::Poor);
    }

    #[test]
    fn test_perfect_and_empty_scores() {
        let perfect = score_inputs(&HealthInputs {
            savings_rate: 40.0,
            credit_utilization: 0.0,
            debt_to_income: 0.0,
            cash_reserve_months: 12.0,
            retirement_growth: 10.0,
        });
        assert_eq!(perfect.score, 100);
        assert_eq!(perfect.rating, HealthRating::Excellent);

        // No income and no accounts: only the "lower is better" metrics score
        let empty = score_inputs(&HealthInputs::default());
        assert_eq!(empty.score, 40);
        assert_eq!(empty.rating, HealthRating::Fair);
    }

    #[test]
    fn test_score_bounds_on_extreme_inputs() {
        let extremes = [f64::NEG_INFINITY, -1e12, -1.0, 0.0, 1e-9, 1e12, f64::INFINITY, f64::NAN];
        for &a in &extremes {
            for &b in &extremes {
                let score = score_inputs(&HealthInputs {
                    savings_rate: a,
                    credit_utilization: b,
                    debt_to_income: a,
                    cash_reserve_months: b,
                    retirement_growth: a,
                });
                assert!(score.score <= 100);
                assert_eq!(score.rating, HealthRating::from_score(score.score));
            }
        }
    }

    #[test]
    fn test_retirement_growth_annualized() {
        let entries = vec![
            entry(date(2024, 1, 1), 1.0),
            entry(date(2025, 1, 1), 10_000.0),
            entry(date(2025, 7, 2), 10_500.0),
        ];
        // 5% over 182 days, annualized
        let growth = retirement_growth(&entries);
        assert!((growth - 5.0 * 365.0 / 182.0).abs() < 1e-9);

        assert_eq!(retirement_growth(&[]), 0.0);
        assert_eq!(retirement_growth(&entries[..1]), 0.0);
    }
}
