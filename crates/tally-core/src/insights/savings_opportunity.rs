//! Savings Opportunity Insight
//!
//! Flags merchants the user pays in several distinct months whose
//! cumulative spend is large enough to be worth a second look.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::temporal;

use super::engine::{AnalysisContext, Insight};
use super::types::{Finding, InsightType};

pub struct SavingsOpportunityInsight;

/// How much one merchant gets across the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantSpend {
    pub merchant: String,
    /// Distinct calendar months with at least one expense
    pub months: usize,
    pub total: f64,
    pub monthly_average: f64,
}

/// Posted expense totals per merchant, in first-seen order
pub fn merchant_spend(ctx: &AnalysisContext<'_>) -> Vec<MerchantSpend> {
    let mut order: Vec<&str> = Vec::new();
    let mut stats: HashMap<&str, (BTreeSet<NaiveDate>, f64)> = HashMap::new();

    for tx in temporal::posted(&ctx.ledger.transactions, ctx.ctx.as_of) {
        let merchant = tx.merchant.trim();
        if !tx.is_expense() || merchant.is_empty() {
            continue;
        }
        let entry = stats.entry(merchant).or_insert_with(|| {
            order.push(merchant);
            (BTreeSet::new(), 0.0)
        });
        entry.0.insert(temporal::month_start(tx.date));
        entry.1 += tx.amount;
    }

    order
        .into_iter()
        .filter_map(|merchant| {
            let (months, total) = stats.remove(merchant)?;
            Some(MerchantSpend {
                merchant: merchant.to_string(),
                months: months.len(),
                total,
                monthly_average: total / months.len().max(1) as f64,
            })
        })
        .collect()
}

impl Insight for SavingsOpportunityInsight {
    fn name(&self) -> &'static str {
        "savings_opportunity"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Vec<Finding> {
        let settings = &ctx.ctx.config.insights;

        merchant_spend(ctx)
            .into_iter()
            .filter(|m| m.months >= settings.merchant_min_months && m.total > settings.merchant_min_total)
            .map(|m| {
                Finding::new(
                    InsightType::SavingsOpportunity,
                    format!("savings:merchant:{}", m.merchant),
                    format!("Regular spending at {}", m.merchant),
                    format!(
                        "${:.0} across {} months at {}. Trimming it by 20% would save about ${:.0}/month",
                        m.total,
                        m.months,
                        m.merchant,
                        m.monthly_average * 0.2
                    ),
                )
                .with_data(serde_json::to_value(&m).unwrap_or_default())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::{EngineContext, Ledger, LedgerRecords};
    use crate::temporal::test_support::*;

    fn run(records: LedgerRecords) -> Vec<Finding> {
        let ctx = EngineContext::new(date(2026, 6, 1), EngineConfig::default());
        let ledger = Ledger::from_records(records, &ctx);
        SavingsOpportunityInsight.analyze(&AnalysisContext::new(&ledger, &ctx))
    }

    fn at(merchant: &str, id: &str, d: NaiveDate, amount: f64) -> crate::models::Transaction {
        in_category(expense(id, d, amount), "Shopping", merchant)
    }

    #[test]
    fn test_frequent_large_merchant_flagged() {
        let findings = run(LedgerRecords {
            transactions: vec![
                at("Corner Cafe", "a", date(2026, 1, 3), 200.0),
                at("Corner Cafe", "b", date(2026, 1, 20), 100.0),
                at("Corner Cafe", "c", date(2026, 2, 3), 150.0),
                at("Corner Cafe", "d", date(2026, 3, 3), 60.0),
                at("Bookshop", "e", date(2026, 1, 3), 400.0),
                at("Bookshop", "f", date(2026, 2, 3), 400.0),
            ],
            ..Default::default()
        });
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].key, "savings:merchant:Corner Cafe");
        assert_eq!(findings[0].data["months"], 3);
    }

    #[test]
    fn test_total_must_exceed_threshold() {
        let findings = run(LedgerRecords {
            transactions: vec![
                at("Gym", "a", date(2026, 1, 1), 100.0),
                at("Gym", "b", date(2026, 2, 1), 200.0),
                at("Gym", "c", date(2026, 3, 1), 200.0),
                // Not yet posted
                at("Gym", "d", date(2026, 7, 1), 200.0),
            ],
            ..Default::default()
        });
        assert!(findings.is_empty());
    }
}
