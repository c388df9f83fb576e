//! Spending Anomaly Insight
//!
//! Compares this month's spend per category with its rolling average.

use crate::budget;

use super::engine::{AnalysisContext, Insight};
use super::types::{Finding, InsightType};

pub struct SpendingAnomalyInsight;

impl Insight for SpendingAnomalyInsight {
    fn name(&self) -> &'static str {
        "spending_anomaly"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Vec<Finding> {
        let window = ctx.ctx.config.insights.rolling_window_months;

        budget::category_anomalies(ctx.ledger, ctx.ctx)
            .into_iter()
            .map(|a| {
                Finding::new(
                    InsightType::Anomaly,
                    format!("anomaly:{}", a.category),
                    format!("Unusual {} spending", a.category),
                    format!(
                        "${:.2} so far this month, {:.1}x your {}-month average of ${:.2}",
                        a.current, a.ratio, window, a.rolling_average
                    ),
                )
                .with_data(serde_json::to_value(&a).unwrap_or_default())
            })
            .collect()
    }
}
