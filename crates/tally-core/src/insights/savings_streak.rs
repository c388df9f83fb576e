//! Savings Streak Insight
//!
//! Celebrates consecutive complete months in which cash income beat cash
//! spending. The month in progress never counts toward or breaks a streak.

use crate::summary;
use crate::temporal;

use super::engine::{AnalysisContext, Insight};
use super::types::{Finding, InsightType};

pub struct SavingsStreakInsight;

/// Trailing run of complete months with positive net cashflow
pub fn savings_streak(ctx: &AnalysisContext<'_>) -> usize {
    let current = temporal::month_start(ctx.ctx.as_of);
    summary::monthly_cashflow(ctx.ledger, ctx.ctx)
        .iter()
        .rev()
        .filter(|m| m.month < current)
        .take_while(|m| m.net > 0.0)
        .count()
}

impl Insight for SavingsStreakInsight {
    fn name(&self) -> &'static str {
        "savings_streak"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Vec<Finding> {
        let streak = savings_streak(ctx);
        if streak < ctx.ctx.config.insights.streak_min_months as usize {
            return vec![];
        }

        vec![Finding::new(
            InsightType::Streak,
            "streak:savings",
            format!("{}-month savings streak", streak),
            format!("You've saved money {} months in a row. Keep it up!", streak),
        )
        .with_data(serde_json::json!({ "months": streak }))]
    }
}
