//! Integration tests for tally-core
//!
//! These tests exercise the full store → ledger → derivation workflow and the
//! bank-feed reconciler against a scripted provider.

use chrono::NaiveDate;
use tally_core::{
    backup,
    balance::live_balances,
    budget::budget_statuses,
    db::Database,
    feed::{self, FeedAccount, FeedClient, FeedSnapshot, FeedTransaction, MockProvider, MockResponse},
    health::{health_score, HealthRating},
    models::{
        AccountKind, Bank, Budget, BudgetPeriod, Card, Frequency, Origin, PaymentType, Scenario,
        Subscription, Transaction, TransactionType, BANK_FEED_PREFIX, UNASSIGNED_ACCOUNT,
    },
    net_worth::net_worth_timeline,
    store::RecordStore,
    summary::cashflow_summary,
    EngineConfig, EngineContext, Ledger, Reconciler,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn transaction(id: &str, d: NaiveDate, amount: f64, kind: TransactionType, account: &str) -> Transaction {
    Transaction {
        id: id.to_string(),
        date: d,
        amount,
        kind,
        category: "General".to_string(),
        merchant: String::new(),
        account: account.to_string(),
        note: String::new(),
        recurring: false,
        origin: Origin::Manual,
    }
}

fn checking(balance: f64) -> Bank {
    Bank {
        id: "chk".to_string(),
        name: "Checking".to_string(),
        institution: None,
        current_balance: balance,
        available_balance: None,
        apy: None,
        last_updated: None,
    }
}

fn visa(balance: f64, limit: f64) -> Card {
    Card {
        id: "visa".to_string(),
        name: "Visa".to_string(),
        institution: None,
        balance,
        limit,
        apr: None,
        last_updated: None,
    }
}

/// Store holding the reference example: income, rent, a far-future income,
/// a card purchase, one subscription and one card
fn reference_store(today: NaiveDate) -> Database {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    db.upsert(&checking(3000.0)).unwrap();
    db.upsert(&visa(400.0, 2000.0)).unwrap();
    for tx in [
        transaction("pay", today, 5000.0, TransactionType::Income, "chk"),
        transaction("rent", today, 1200.0, TransactionType::Expense, "chk"),
        transaction("bonus", date(2099, 1, 1), 500.0, TransactionType::Income, "chk"),
        transaction("dinner", today, 100.0, TransactionType::Expense, "visa"),
    ] {
        db.upsert(&tx).unwrap();
    }
    db.upsert(&Subscription {
        id: "music".to_string(),
        name: "Music".to_string(),
        amount: 12.0,
        frequency: Frequency::Monthly,
        category: None,
        is_active: true,
    })
    .unwrap();
    db
}

// =============================================================================
// Derivation Workflow
// =============================================================================

#[test]
fn test_reference_cashflow_example() {
    let today = date(2026, 4, 15);
    let db = reference_store(today);
    let ctx = EngineContext::new(today, EngineConfig::default());
    let ledger = Ledger::load(&db, &ctx).unwrap();

    let summary = cashflow_summary(&ledger, &ctx);
    assert_eq!(summary.net_cashflow, 3800.0);
    assert_eq!(summary.monthly_subscription_cost, 12.0);
    assert_eq!(summary.credit_utilization, 20.0);
}

#[test]
fn test_balance_conservation_across_reference_dates() {
    let today = date(2026, 4, 15);
    let db = reference_store(today);

    for as_of in [date(2026, 1, 1), today, date(2026, 12, 31), date(2100, 1, 1)] {
        let ctx = EngineContext::new(as_of, EngineConfig::default());
        let ledger = Ledger::load(&db, &ctx).unwrap();
        for b in live_balances(&ledger, &ctx) {
            let lhs = b.live_balance - b.pending_delta;
            let rhs = b.anchor_balance + b.posted_delta;
            assert!((lhs - rhs).abs() < 1e-9, "{} at {}", b.account_id, as_of);
        }
    }
}

#[test]
fn test_net_worth_with_no_transactions() {
    let db = Database::in_memory().unwrap();
    db.upsert(&checking(10_000.0)).unwrap();
    let ctx = EngineContext::new(date(2026, 4, 15), EngineConfig::default());
    let ledger = Ledger::load(&db, &ctx).unwrap();

    let timeline = net_worth_timeline(&ledger, &ctx);
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].month, date(2026, 4, 1));
    assert_eq!(timeline[0].assets, 10_000.0);
    assert_eq!(timeline[0].liabilities, 0.0);
    assert_eq!(timeline[0].net, 10_000.0);
}

#[test]
fn test_health_score_bounds_for_degenerate_ledgers() {
    let ctx = EngineContext::new(date(2026, 4, 15), EngineConfig::default());

    // Expenses with no income
    let db = Database::in_memory().unwrap();
    db.upsert(&transaction(
        "x",
        date(2026, 4, 2),
        9_999_999.0,
        TransactionType::Expense,
        UNASSIGNED_ACCOUNT,
    ))
    .unwrap();
    // Debt on a card with no limit
    db.upsert(&visa(50_000.0, 0.0)).unwrap();

    for store in [Database::in_memory().unwrap(), db] {
        let ledger = Ledger::load(&store, &ctx).unwrap();
        let score = health_score(&ledger, &ctx);
        assert!(score.score <= 100);
        assert_eq!(score.rating, HealthRating::from_score(score.score));
        assert_eq!(score.metrics.len(), 5);
    }
}

#[test]
fn test_scenario_neutrality() {
    let today = date(2026, 4, 15);
    let db = reference_store(today);
    db.upsert(&Budget {
        id: "b1".to_string(),
        category: "General".to_string(),
        amount: 2000.0,
        period: BudgetPeriod::Monthly,
        start_date: date(2026, 1, 1),
        is_active: true,
    })
    .unwrap();
    let ctx = EngineContext::new(today, EngineConfig::default());

    let snapshot = |ledger: &Ledger| {
        serde_json::json!({
            "cashflow": cashflow_summary(ledger, &ctx),
            "balances": live_balances(ledger, &ctx),
            "budgets": budget_statuses(ledger, &ctx),
            "netWorth": net_worth_timeline(ledger, &ctx),
            "health": health_score(ledger, &ctx),
        })
    };
    let before = snapshot(&Ledger::load(&db, &ctx).unwrap());

    let mut scenario = Scenario {
        id: "tv".to_string(),
        name: "Television".to_string(),
        amount: 900.0,
        duration_months: 3,
        payment_type: PaymentType::Cash,
        schedule_date: date(2026, 4, 1),
        account_id: Some("chk".to_string()),
        is_applied: true,
    };
    db.upsert(&scenario).unwrap();
    let applied = Ledger::load(&db, &ctx).unwrap();
    assert_eq!(
        applied
            .transactions
            .iter()
            .filter(|t| t.origin == Origin::Synthetic)
            .count(),
        3
    );
    assert_ne!(snapshot(&applied), before);

    scenario.is_applied = false;
    db.upsert(&scenario).unwrap();
    let after = Ledger::load(&db, &ctx).unwrap();
    assert!(after.transactions.iter().all(|t| t.origin != Origin::Synthetic));
    assert_eq!(snapshot(&after), before);

    // Installments are never written back
    assert_eq!(db.list::<Transaction>().unwrap().len(), 4);
}

// =============================================================================
// Reconciler Workflow
// =============================================================================

fn feed_snapshot() -> FeedSnapshot {
    let tx = |id: &str, d: NaiveDate, amount: f64| FeedTransaction {
        provider_tx_id: id.to_string(),
        date: d,
        amount,
        description: format!("Merchant {}", id),
    };
    FeedSnapshot {
        accounts: vec![
            FeedAccount {
                provider_account_id: "chk".to_string(),
                name: "Feed Checking".to_string(),
                institution: Some("Feed Bank".to_string()),
                kind: AccountKind::Bank,
                balance: 800.0,
                available_balance: None,
                limit: None,
                transactions: vec![
                    tx("a", date(2026, 3, 1), -20.0),
                    tx("b", date(2026, 3, 2), 1500.0),
                    tx("stale", date(2024, 3, 2), -5.0),
                ],
            },
            FeedAccount {
                provider_account_id: "cc".to_string(),
                name: "Feed Card".to_string(),
                institution: Some("Feed Bank".to_string()),
                kind: AccountKind::Card,
                balance: 75.0,
                available_balance: None,
                limit: Some(1000.0),
                transactions: vec![tx("c", date(2026, 3, 3), -75.0)],
            },
        ],
        skipped: 0,
    }
}

#[tokio::test]
async fn test_sync_is_idempotent_and_respects_cutoff() {
    let mock = MockProvider::new();
    mock.respond_with(MockResponse::Snapshot(feed_snapshot()));
    let db = Database::in_memory().unwrap();
    // An older wide-window sync left a row before the cutoff
    db.upsert(&Transaction {
        origin: Origin::Imported,
        ..transaction(
            "bank-feed:legacy:chk:old",
            date(2024, 12, 1),
            10.0,
            TransactionType::Expense,
            "bank-feed:legacy:chk",
        )
    })
    .unwrap();

    let ctx = EngineContext::new(date(2026, 4, 1), EngineConfig::default());
    let cutoff = ctx.import_cutoff();
    let reconciler = Reconciler::with_client(db.clone(), ctx, FeedClient::mock(mock.clone()));
    let conn = reconciler
        .link(tally_core::models::FeedProviderKind::SimpleFin, "token", "Feed Bank")
        .await
        .unwrap();

    reconciler.sync(&conn.connection_id).await.unwrap();
    let first: Vec<Transaction> = db.list().unwrap();

    // User edits the anchor; a second identical sync must not touch it
    let card_id = feed::account_id(&conn.connection_id, "cc");
    let mut card = db.get::<Card>(&card_id).unwrap().unwrap();
    card.balance = 75.0;
    db.upsert(&card).unwrap();

    let report = reconciler.sync(&conn.connection_id).await.unwrap();
    assert_eq!(report.accounts_inserted, 0);
    assert_eq!(mock.fetch_count(), 2);

    let second: Vec<Transaction> = db.list().unwrap();
    assert_eq!(first.len(), second.len());
    assert_eq!(second.len(), 3);
    assert_eq!(db.get::<Card>(&card_id).unwrap().unwrap().balance, 75.0);

    assert!(second
        .iter()
        .filter(|t| t.id.starts_with(BANK_FEED_PREFIX))
        .all(|t| t.date >= cutoff));
}

#[tokio::test]
async fn test_imported_card_activity_is_not_double_counted() {
    let mock = MockProvider::new();
    mock.respond_with(MockResponse::Snapshot(feed_snapshot()));
    let db = Database::in_memory().unwrap();
    let ctx = EngineContext::new(date(2026, 4, 1), EngineConfig::default());
    let reconciler = Reconciler::with_client(db.clone(), ctx.clone(), FeedClient::mock(mock));
    let conn = reconciler
        .link(tally_core::models::FeedProviderKind::SimpleFin, "token", "")
        .await
        .unwrap();
    reconciler.sync(&conn.connection_id).await.unwrap();

    let card_id = feed::account_id(&conn.connection_id, "cc");
    let mut card = db.get::<Card>(&card_id).unwrap().unwrap();
    card.balance = 75.0;
    db.upsert(&card).unwrap();

    let ledger = Ledger::load(&db, &ctx).unwrap();
    let card_view = live_balances(&ledger, &ctx)
        .into_iter()
        .find(|b| b.account_id == card_id)
        .unwrap();
    assert_eq!(card_view.live_debt, Some(75.0));
}

#[test]
fn test_backup_restore_replay_is_stable() {
    let today = date(2026, 4, 15);
    let source = reference_store(today);
    let envelope = backup::export_backup(&source).unwrap();
    let bytes = serde_json::to_vec(&envelope).unwrap();

    let target = Database::in_memory().unwrap();
    let parsed = backup::parse_backup(&bytes).unwrap();
    backup::restore_backup(&target, &parsed).unwrap();
    backup::restore_backup(&target, &parsed).unwrap();

    let ctx = EngineContext::new(today, EngineConfig::default());
    let original = cashflow_summary(&Ledger::load(&source, &ctx).unwrap(), &ctx);
    let restored = cashflow_summary(&Ledger::load(&target, &ctx).unwrap(), &ctx);
    assert_eq!(
        serde_json::to_value(original).unwrap(),
        serde_json::to_value(restored).unwrap()
    );
    assert_eq!(target.list::<Transaction>().unwrap().len(), 4);
}
