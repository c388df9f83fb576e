//! Budget Alert Insight
//!
//! Warns when a budget is used up, or nearly so.

use crate::budget;
use crate::models::BudgetPeriod;

use super::engine::{AnalysisContext, Insight};
use super::types::{Finding, InsightType};

pub struct BudgetAlertInsight;

impl Insight for BudgetAlertInsight {
    fn name(&self) -> &'static str {
        "budget_alerts"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Vec<Finding> {
        let almost = ctx.ctx.config.insights.almost_at_limit_pct;

        budget::budget_statuses(ctx.ledger, ctx.ctx)
            .into_iter()
            .filter_map(|status| {
                let (kind, title) = if status.pct_used >= 100.0 {
                    (InsightType::Overspend, format!("{} budget exceeded", status.category))
                } else if status.pct_used >= almost {
                    (
                        InsightType::AlmostAtLimit,
                        format!("{} budget almost used", status.category),
                    )
                } else {
                    return None;
                };

                Some(
                    Finding::new(
                        kind,
                        format!("budget:{}:{}", kind, status.budget_id),
                        title,
                        format!(
                            "${:.2} of ${:.2} spent this {} ({:.0}%)",
                            status.spent,
                            status.amount,
                            period_noun(status.period),
                            status.pct_used
                        ),
                    )
                    .with_data(serde_json::json!({
                        "budgetId": status.budget_id,
                        "spent": status.spent,
                        "amount": status.amount,
                        "pctUsed": status.pct_used,
                    })),
                )
            })
            .collect()
    }
}

fn period_noun(period: BudgetPeriod) -> &'static str {
    match period {
        BudgetPeriod::Weekly => "week",
        BudgetPeriod::Monthly => "month",
        BudgetPeriod::Yearly => "year",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::{EngineContext, Ledger, LedgerRecords};
    use crate::models::Budget;
    use crate::temporal::test_support::*;

    fn budget(id: &str, category: &str, amount: f64, active: bool) -> Budget {
        Budget {
            id: id.into(),
            category: category.into(),
            amount,
            period: BudgetPeriod::Monthly,
            start_date: date(2026, 1, 1),
            is_active: active,
        }
    }

    #[test]
    fn test_overspend_and_almost_at_limit() {
        let ctx = EngineContext::new(date(2026, 5, 20), EngineConfig::default());
        let records = LedgerRecords {
            transactions: vec![
                in_category(expense("a", date(2026, 5, 2), 100.0), "Dining", ""),
                in_category(expense("b", date(2026, 5, 3), 95.0), "Fuel", ""),
                in_category(expense("c", date(2026, 5, 4), 50.0), "Books", ""),
                in_category(expense("d", date(2026, 5, 5), 500.0), "Toys", ""),
            ],
            budgets: vec![
                budget("dining", "Dining", 100.0, true),
                budget("fuel", "Fuel", 100.0, true),
                budget("books", "Books", 100.0, true),
                budget("toys", "Toys", 100.0, false),
            ],
            ..Default::default()
        };
        let ledger = Ledger::from_records(records, &ctx);
        let findings = BudgetAlertInsight.analyze(&AnalysisContext::new(&ledger, &ctx));

        let keys: Vec<_> = findings.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["budget:overspend:dining", "budget:almost-at-limit:fuel"]
        );
        assert!(findings
            .iter()
            .all(|f| f.severity == crate::insights::Severity::Warning));
    }
}
