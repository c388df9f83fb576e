//! Temporal classification of transactions
//!
//! Every transaction is posted (dated on or before the reference date) or
//! scheduled (dated after it). Independently it is imported, manual, or
//! synthetic. The import cutoff is applied once at ingestion by
//! [`ingest`]; downstream code only needs `is_posted` / `is_scheduled`.

use chrono::{Datelike, Months, NaiveDate};

use crate::models::{Origin, Transaction};

/// Dated on or before `as_of`
pub fn is_posted(tx: &Transaction, as_of: NaiveDate) -> bool {
    tx.date <= as_of
}

/// Dated after `as_of`
pub fn is_scheduled(tx: &Transaction, as_of: NaiveDate) -> bool {
    tx.date > as_of
}

/// Came from a bank feed. Synthetic scenario rows are never imported,
/// whatever their id or note say.
pub fn is_imported(tx: &Transaction) -> bool {
    match tx.origin {
        Origin::Imported => true,
        Origin::Synthetic => false,
        Origin::Manual => Origin::detect(&tx.id, &tx.note) == Origin::Imported,
    }
}

/// Imported rows must be dated on or after the cutoff; everything else passes.
pub fn is_allowed(tx: &Transaction, cutoff: NaiveDate) -> bool {
    !is_imported(tx) || tx.date >= cutoff
}

/// Normalize stored transactions for derivation: re-derive `origin` from the
/// wire signals and drop imported rows older than the cutoff.
pub fn ingest(transactions: Vec<Transaction>, cutoff: NaiveDate) -> Vec<Transaction> {
    let before = transactions.len();
    let kept: Vec<Transaction> = transactions
        .into_iter()
        .map(|mut tx| {
            if tx.origin != Origin::Synthetic {
                tx.origin = Origin::detect(&tx.id, &tx.note);
            }
            tx
        })
        .filter(|tx| is_allowed(tx, cutoff))
        .collect();

    if kept.len() < before {
        tracing::debug!(
            dropped = before - kept.len(),
            cutoff = %cutoff,
            "Excluded imported transactions before cutoff"
        );
    }
    kept
}

pub fn posted(txs: &[Transaction], as_of: NaiveDate) -> impl Iterator<Item = &Transaction> {
    txs.iter().filter(move |tx| is_posted(tx, as_of))
}

pub fn scheduled(txs: &[Transaction], as_of: NaiveDate) -> impl Iterator<Item = &Transaction> {
    txs.iter().filter(move |tx| is_scheduled(tx, as_of))
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Month start shifted by `months` (negative goes back)
pub fn shift_month(month: NaiveDate, months: i32) -> NaiveDate {
    let start = month_start(month);
    let shifted = if months >= 0 {
        start.checked_add_months(Months::new(months as u32))
    } else {
        start.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(start)
}

/// Whole months from `from`'s month to `to`'s month
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use crate::models::{Origin, Transaction, TransactionType, UNASSIGNED_ACCOUNT};

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn tx(id: &str, d: NaiveDate, amount: f64, kind: TransactionType) -> Transaction {
        Transaction {
            id: id.to_string(),
            date: d,
            amount,
            kind,
            category: "General".to_string(),
            merchant: String::new(),
            account: UNASSIGNED_ACCOUNT.to_string(),
            note: String::new(),
            recurring: false,
            origin: Origin::Manual,
        }
    }

    pub fn expense(id: &str, d: NaiveDate, amount: f64) -> Transaction {
        tx(id, d, amount, TransactionType::Expense)
    }

    pub fn income(id: &str, d: NaiveDate, amount: f64) -> Transaction {
        tx(id, d, amount, TransactionType::Income)
    }

    pub fn on_account(mut t: Transaction, account: &str) -> Transaction {
        t.account = account.to_string();
        t
    }

    pub fn in_category(mut t: Transaction, category: &str, merchant: &str) -> Transaction {
        t.category = category.to_string();
        t.merchant = merchant.to_string();
        t
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_posted_and_scheduled_partition() {
        let as_of = date(2026, 5, 10);
        let txs = vec![
            expense("a", date(2026, 5, 10), 1.0),
            expense("b", date(2026, 5, 11), 1.0),
            expense("c", date(2025, 1, 1), 1.0),
        ];
        let posted_ids: Vec<_> = posted(&txs, as_of).map(|t| t.id.as_str()).collect();
        let sched_ids: Vec<_> = scheduled(&txs, as_of).map(|t| t.id.as_str()).collect();
        assert_eq!(posted_ids, vec!["a", "c"]);
        assert_eq!(sched_ids, vec!["b"]);
    }

    #[test]
    fn test_is_imported_signals() {
        let d = date(2026, 1, 1);
        assert!(is_imported(&expense("bank-feed:c1:a1:t1", d, 1.0)));

        let mut noted = expense("x", d, 1.0);
        noted.note = "Imported From Plaid".into();
        assert!(is_imported(&noted));

        let mut synthetic = expense("bank-feed:looks-imported", d, 1.0);
        synthetic.origin = Origin::Synthetic;
        assert!(!is_imported(&synthetic));
    }

    #[test]
    fn test_cutoff_only_applies_to_imported() {
        let cutoff = date(2025, 1, 1);
        let old_manual = expense("m", date(2020, 1, 1), 5.0);
        let old_imported = expense("bank-feed:c:a:t", date(2024, 12, 31), 5.0);
        let new_imported = expense("bank-feed:c:a:u", date(2025, 1, 1), 5.0);

        let kept = ingest(vec![old_manual, old_imported, new_imported], cutoff);
        let ids: Vec<_> = kept.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["m", "bank-feed:c:a:u"]);
        assert_eq!(kept[1].origin, Origin::Imported);
    }

    #[test]
    fn test_month_arithmetic() {
        assert_eq!(month_start(date(2026, 3, 31)), date(2026, 3, 1));
        assert_eq!(shift_month(date(2026, 1, 15), -1), date(2025, 12, 1));
        assert_eq!(shift_month(date(2026, 11, 2), 3), date(2027, 2, 1));
        assert_eq!(months_between(date(2025, 11, 30), date(2026, 2, 1)), 3);
        assert_eq!(months_between(date(2026, 2, 1), date(2026, 2, 28)), 0);
    }
}
