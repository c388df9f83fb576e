//! Net worth timeline
//!
//! The timeline is rebuilt backward from today's anchors: the sum of every
//! monthly delta is removed from the present totals to find the starting
//! balances, then the months are replayed forward. The last point therefore
//! matches the present anchors exactly, while earlier points are only as
//! good as the transaction history. Transfers from before the first recorded
//! transaction shift every historical point by the same constant and are not
//! corrected for.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::context::{EngineContext, Ledger};
use crate::models::{AccountKind, RetirementEntry};
use crate::temporal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetWorthPoint {
    /// First day of the month
    pub month: NaiveDate,
    pub assets: f64,
    pub liabilities: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct MonthDelta {
    bank: f64,
    card: f64,
}

/// Retirement balance to pair with `month`: the latest entry dated in that
/// month, else the latest entry overall
fn retirement_for(entries: &[RetirementEntry], month: NaiveDate) -> f64 {
    entries
        .iter()
        .filter(|e| temporal::month_start(e.date) == month)
        .max_by_key(|e| e.date)
        .or_else(|| entries.iter().max_by_key(|e| e.date))
        .map_or(0.0, |e| e.balance)
}

fn point(month: NaiveDate, bank: f64, card: f64, retirement: f64) -> NetWorthPoint {
    let assets = bank.max(0.0) + retirement;
    let liabilities = card.max(0.0);
    NetWorthPoint {
        month,
        assets,
        liabilities,
        net: assets - liabilities,
    }
}

/// Month-by-month assets, liabilities and net worth ending at the
/// reference month
pub fn net_worth_timeline(ledger: &Ledger, ctx: &EngineContext) -> Vec<NetWorthPoint> {
    let total_bank = ledger.total_bank_balance();
    let total_card = ledger.total_card_debt();
    let current_month = temporal::month_start(ctx.as_of);

    // Deltas use the bank convention: income positive, expense negative
    let mut buckets: BTreeMap<NaiveDate, MonthDelta> = BTreeMap::new();
    for tx in temporal::posted(&ledger.transactions, ctx.as_of) {
        let bucket = buckets.entry(temporal::month_start(tx.date)).or_default();
        match ledger.account_kind(&tx.account) {
            AccountKind::Bank => bucket.bank += tx.signed_amount(),
            AccountKind::Card => bucket.card += tx.signed_amount(),
        }
    }

    if buckets.is_empty() {
        let retirement = retirement_for(&ledger.retirement, current_month);
        return vec![point(current_month, total_bank, total_card, retirement)];
    }
    buckets.entry(current_month).or_default();

    let total_bank_delta: f64 = buckets.values().map(|d| d.bank).sum();
    let total_card_delta: f64 = buckets.values().map(|d| d.card).sum();

    // A card expense (negative delta) raises debt, so the card walk runs inverted
    let mut bank_running = total_bank - total_bank_delta;
    let mut card_running = total_card + total_card_delta;

    let points: Vec<NetWorthPoint> = buckets
        .into_iter()
        .map(|(month, delta)| {
            bank_running += delta.bank;
            card_running -= delta.card;
            point(
                month,
                bank_running,
                card_running,
                retirement_for(&ledger.retirement, month),
            )
        })
        .collect();

    tracing::debug!(points = points.len(), "Built net worth timeline");
    points
}
