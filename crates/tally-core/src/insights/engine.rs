//! Insight engine - runs the rule cascade in order

use crate::context::{EngineContext, Ledger};

use super::types::Finding;
use super::{
    BudgetAlertInsight, DataTipInsight, SavingsOpportunityInsight, SavingsStreakInsight,
    SpendingAnomalyInsight,
};

/// Inputs every rule reads
pub struct AnalysisContext<'a> {
    pub ledger: &'a Ledger,
    pub ctx: &'a EngineContext,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(ledger: &'a Ledger, ctx: &'a EngineContext) -> Self {
        Self { ledger, ctx }
    }
}

/// One rule of the cascade. Rules are pure functions of the ledger.
pub trait Insight: Send + Sync {
    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Analyze data and produce findings
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Vec<Finding>;
}

/// Ordered rule cascade. Every rule runs; findings keep rule order.
pub struct InsightEngine {
    insights: Vec<Box<dyn Insight>>,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightEngine {
    /// Engine with the built-in rules, in cascade order
    pub fn new() -> Self {
        let mut engine = Self { insights: vec![] };

        engine.register(Box::new(BudgetAlertInsight));
        engine.register(Box::new(SpendingAnomalyInsight));
        engine.register(Box::new(SavingsStreakInsight));
        engine.register(Box::new(SavingsOpportunityInsight));
        engine.register(Box::new(DataTipInsight));

        engine
    }

    /// Append a rule to the end of the cascade
    pub fn register(&mut self, insight: Box<dyn Insight>) {
        self.insights.push(insight);
    }

    pub fn analyze_all(&self, ctx: &AnalysisContext<'_>) -> Vec<Finding> {
        let mut all_findings = vec![];

        for insight in &self.insights {
            let findings = insight.analyze(ctx);
            tracing::debug!(
                insight = insight.name(),
                count = findings.len(),
                "Insight rule complete"
            );
            all_findings.extend(findings);
        }

        all_findings
    }

    /// Names of registered rules, in order
    pub fn list_insights(&self) -> Vec<&'static str> {
        self.insights.iter().map(|i| i.name()).collect()
    }
}

/// Run the built-in cascade over a ledger
pub fn generate_insights(ledger: &Ledger, ctx: &EngineContext) -> Vec<Finding> {
    InsightEngine::new().analyze_all(&AnalysisContext::new(ledger, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::LedgerRecords;
    use crate::insights::InsightType;
    use crate::models::{Budget, BudgetPeriod};
    use crate::temporal::test_support::*;

    struct Always;

    impl Insight for Always {
        fn name(&self) -> &'static str {
            "always"
        }

        fn analyze(&self, _ctx: &AnalysisContext<'_>) -> Vec<Finding> {
            vec![Finding::new(
                InsightType::Tip,
                "always",
                "Always",
                "Always fires",
            )]
        }
    }

    #[test]
    fn test_engine_registers_cascade_in_order() {
        let engine = InsightEngine::new();
        assert_eq!(
            engine.list_insights(),
            vec![
                "budget_alerts",
                "spending_anomaly",
                "savings_streak",
                "savings_opportunity",
                "data_tips"
            ]
        );
    }

    #[test]
    fn test_custom_rule_runs_last() {
        let ctx = EngineContext::new(date(2026, 4, 10), EngineConfig::default());
        let ledger = Ledger::default();
        let mut engine = InsightEngine::new();
        engine.register(Box::new(Always));
        let findings = engine.analyze_all(&AnalysisContext::new(&ledger, &ctx));
        assert_eq!(findings.last().map(|f| f.key.as_str()), Some("always"));
    }

    #[test]
    fn test_all_matching_rules_emit() {
        let ctx = EngineContext::new(date(2026, 4, 20), EngineConfig::default());
        let dining = |id: &str, d, amount| in_category(expense(id, d, amount), "Dining", "Bistro");
        let records = LedgerRecords {
            transactions: vec![
                income("jan-pay", date(2026, 1, 1), 3000.0),
                income("feb-pay", date(2026, 2, 1), 3000.0),
                income("mar-pay", date(2026, 3, 1), 3000.0),
                dining("jan", date(2026, 1, 10), 100.0),
                dining("feb", date(2026, 2, 10), 100.0),
                dining("mar", date(2026, 3, 10), 100.0),
                dining("apr", date(2026, 4, 10), 400.0),
            ],
            budgets: vec![Budget {
                id: "dining".into(),
                category: "Dining".into(),
                amount: 300.0,
                period: BudgetPeriod::Monthly,
                start_date: date(2026, 1, 1),
                is_active: true,
            }],
            ..Default::default()
        };
        let ledger = Ledger::from_records(records, &ctx);
        let kinds: Vec<InsightType> = generate_insights(&ledger, &ctx)
            .into_iter()
            .map(|f| f.insight_type)
            .collect();

        assert_eq!(
            kinds,
            vec![
                InsightType::Overspend,
                InsightType::Anomaly,
                InsightType::Streak,
                InsightType::SavingsOpportunity
            ]
        );
    }
}
