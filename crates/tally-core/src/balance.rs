//! Balance reconstruction
//!
//! A live balance is the stored anchor plus the posted deltas booked after
//! the anchor's "as of" point (`last_updated`, or every posted transaction
//! when the anchor has no date). Future-dated deltas are reported as pending
//! and never folded into the live figure.
//!
//! Sign conventions:
//! - bank: income adds, expense subtracts
//! - card: the balance is debt, so an expense adds and a payment (income) subtracts
//!
//! For cards, `live_debt` leaves out imported transactions: a feed-set card
//! balance already reflects everything the provider has seen.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::context::{EngineContext, Ledger};
use crate::models::{Account, AccountKind, Transaction};
use crate::temporal;

/// Live view of one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveBalance {
    pub account_id: String,
    pub name: String,
    pub kind: AccountKind,
    pub anchor_balance: f64,
    /// Sum of posted deltas since the anchor, in the account's own convention
    pub posted_delta: f64,
    /// Sum of scheduled (future) deltas, in the account's own convention
    pub pending_delta: f64,
    /// anchor + posted + pending
    pub live_balance: f64,
    /// Cards only: anchor plus posted non-imported deltas
    pub live_debt: Option<f64>,
}

/// Delta of one transaction in the convention of an account of `kind`
pub fn account_delta(tx: &Transaction, kind: AccountKind) -> f64 {
    match kind {
        AccountKind::Bank => tx.signed_amount(),
        AccountKind::Card => -tx.signed_amount(),
    }
}

fn since_anchor(tx: &Transaction, anchor_date: Option<NaiveDate>) -> bool {
    anchor_date.map_or(true, |d| tx.date > d)
}

fn anchor_date(account: &Account) -> Option<NaiveDate> {
    match account {
        Account::Bank(b) => b.last_updated,
        Account::Card(c) => c.last_updated,
    }
}

/// Reconstruct the live balance of one account from its transactions
pub fn live_balance(account: &Account, transactions: &[Transaction], as_of: NaiveDate) -> LiveBalance {
    let kind = account.kind();
    let anchor = account.anchor_balance();
    let anchored_at = anchor_date(account);

    let mut posted_delta = 0.0;
    let mut posted_delta_manual = 0.0;
    let mut pending_delta = 0.0;

    for tx in transactions.iter().filter(|t| t.account == account.id()) {
        let delta = account_delta(tx, kind);
        if temporal::is_scheduled(tx, as_of) {
            pending_delta += delta;
        } else if since_anchor(tx, anchored_at) {
            posted_delta += delta;
            if !temporal::is_imported(tx) {
                posted_delta_manual += delta;
            }
        }
    }

    LiveBalance {
        account_id: account.id().to_string(),
        name: account.name().to_string(),
        kind,
        anchor_balance: anchor,
        posted_delta,
        pending_delta,
        live_balance: anchor + posted_delta + pending_delta,
        live_debt: match kind {
            AccountKind::Card => Some(anchor + posted_delta_manual),
            AccountKind::Bank => None,
        },
    }
}

/// Live balances for every bank and card in the ledger
pub fn live_balances(ledger: &Ledger, ctx: &EngineContext) -> Vec<LiveBalance> {
    ledger
        .accounts()
        .iter()
        .map(|a| live_balance(a, &ledger.transactions, ctx.as_of))
        .collect()
}

/// Pending impact across all accounts, split by kind
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PendingImpact {
    pub bank: f64,
    pub card: f64,
}

pub fn pending_impact(balances: &[LiveBalance]) -> PendingImpact {
    balances.iter().fold(PendingImpact::default(), |mut acc, b| {
        match b.kind {
            AccountKind::Bank => acc.bank += b.pending_delta,
            AccountKind::Card => acc.card += b.pending_delta,
        }
        acc
    })
}
