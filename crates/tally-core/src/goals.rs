//! Goal progress

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::balance;
use crate::context::{EngineContext, Ledger};
use crate::models::{Account, Goal, GoalKind};
use crate::summary::percent;
use crate::temporal;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal_id: String,
    pub name: String,
    pub kind: GoalKind,
    pub target: f64,
    pub current: f64,
    /// True when `current` came from the linked account
    pub derived_from_account: bool,
    /// Progress in `[0, 100]`
    pub pct: f64,
    pub remaining: f64,
    pub months_left: Option<i32>,
    pub required_monthly: Option<f64>,
}

/// Current amount for a goal: derived from the linked account when it still
/// exists, otherwise the stored value
fn current_amount(goal: &Goal, ledger: &Ledger, as_of: NaiveDate) -> Option<f64> {
    let account = ledger.account(goal.linked_account.as_deref()?)?;
    let live = balance::live_balance(&account, &ledger.transactions, as_of);
    match account {
        Account::Bank(_) => Some(live.anchor_balance + live.posted_delta),
        Account::Card(card) => {
            let debt = live.live_debt.unwrap_or(card.balance);
            let starting = goal.starting_amount.unwrap_or(goal.target_amount);
            Some((starting - debt).max(0.0))
        }
    }
}

/// Months from `as_of` to the deadline, counting a partial month as one
fn months_until(as_of: NaiveDate, deadline: NaiveDate) -> i32 {
    if deadline <= as_of {
        return 0;
    }
    temporal::months_between(as_of, deadline).max(1)
}

pub fn goal_progress(goal: &Goal, ledger: &Ledger, as_of: NaiveDate) -> GoalProgress {
    let derived = current_amount(goal, ledger, as_of);
    if derived.is_none() && goal.linked_account.is_some() {
        tracing::debug!(
            goal_id = %goal.id,
            "Linked account missing, using stored goal amount"
        );
    }
    let current = derived.unwrap_or(goal.current_amount);
    let remaining = (goal.target_amount - current).max(0.0);
    let months_left = goal.deadline.map(|d| months_until(as_of, d));
    let required_monthly = months_left.map(|m| {
        if m > 0 {
            remaining / m as f64
        } else {
            remaining
        }
    });

    GoalProgress {
        goal_id: goal.id.clone(),
        name: goal.name.clone(),
        kind: goal.kind,
        target: goal.target_amount,
        current,
        derived_from_account: derived.is_some(),
        pct: percent(current, goal.target_amount).clamp(0.0, 100.0),
        remaining,
        months_left,
        required_monthly,
    }
}

pub fn all_goal_progress(ledger: &Ledger, ctx: &EngineContext) -> Vec<GoalProgress> {
    ledger
        .goals
        .iter()
        .map(|g| goal_progress(g, ledger, ctx.as_of))
        .collect()
}
