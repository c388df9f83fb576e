//! Getting-started tips when the ledger is sparse

use super::engine::{AnalysisContext, Insight};
use super::types::{Finding, InsightType};

pub struct DataTipInsight;

impl Insight for DataTipInsight {
    fn name(&self) -> &'static str {
        "data_tips"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Vec<Finding> {
        let mut findings = vec![];

        if ctx.ledger.transactions.is_empty() {
            findings.push(Finding::new(
                InsightType::Tip,
                "tip:no-transactions",
                "Add your first transactions",
                "Record a few transactions or link a bank feed to start seeing trends",
            ));
        }
        if ctx.ledger.budgets.is_empty() {
            findings.push(Finding::new(
                InsightType::Tip,
                "tip:no-budgets",
                "Set up a budget",
                "Budgets let Tally warn you before a category runs over",
            ));
        }

        findings
    }
}
