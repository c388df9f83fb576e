//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use chrono::NaiveDate;
use tally_core::models::{
    Bank, BankFeedConnection, Budget, BudgetPeriod, ConnectionStatus, FeedProviderKind, Goal,
    GoalKind, Origin, PaymentType, Scenario, Transaction, TransactionType, UNASSIGNED_ACCOUNT,
};
use tally_core::{Database, EngineConfig, EngineContext, RecordStore};

use crate::commands::{self, money, truncate, Output};

const TABLE: Output = Output { json: false };
const JSON: Output = Output { json: true };

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ctx() -> EngineContext {
    EngineContext::new(date(2026, 3, 20), EngineConfig::default())
}

fn tx(id: &str, d: NaiveDate, amount: f64, kind: TransactionType, category: &str) -> Transaction {
    Transaction {
        id: id.to_string(),
        date: d,
        amount,
        kind,
        category: category.to_string(),
        merchant: "Shop".to_string(),
        account: "chk".to_string(),
        note: String::new(),
        recurring: false,
        origin: Origin::Manual,
    }
}

fn setup_test_db() -> Database {
    let db = Database::in_memory().unwrap();
    db.upsert(&Bank {
        id: "chk".to_string(),
        name: "Checking".to_string(),
        institution: None,
        current_balance: 2500.0,
        available_balance: None,
        apy: None,
        last_updated: None,
    })
    .unwrap();
    db.upsert(&tx("pay", date(2026, 3, 1), 4000.0, TransactionType::Income, "Salary"))
        .unwrap();
    db.upsert(&tx("food", date(2026, 3, 5), 320.0, TransactionType::Expense, "Groceries"))
        .unwrap();
    db.upsert(&Budget {
        id: "b1".to_string(),
        category: "Groceries".to_string(),
        amount: 300.0,
        period: BudgetPeriod::Monthly,
        start_date: date(2026, 1, 1),
        is_active: true,
    })
    .unwrap();
    db.upsert(&Goal {
        id: "g1".to_string(),
        name: "Emergency fund".to_string(),
        kind: GoalKind::Savings,
        target_amount: 10_000.0,
        current_amount: 0.0,
        deadline: Some(date(2026, 12, 31)),
        linked_account: Some("chk".to_string()),
        starting_amount: None,
    })
    .unwrap();
    db.upsert(&Scenario {
        id: "sofa".to_string(),
        name: "Sofa".to_string(),
        amount: 1200.0,
        duration_months: 6,
        payment_type: PaymentType::Card,
        schedule_date: date(2026, 4, 1),
        account_id: None,
        is_applied: false,
    })
    .unwrap();
    db
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer name", 10), "a much ...");
    assert_eq!(truncate("café au lait", 6), "caf...");
}

#[test]
fn test_money() {
    assert_eq!(money(12.5), "$12.50");
    assert_eq!(money(-3.0), "-$3.00");
    assert_eq!(money(0.0), "$0.00");
}

#[test]
fn test_engine_context_from_flags() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "import_cutoff = \"2024-06-01\"").unwrap();

    let ctx = commands::engine_context(Some("2026-02-28"), Some(file.path())).unwrap();
    assert_eq!(ctx.as_of, date(2026, 2, 28));
    assert_eq!(ctx.import_cutoff(), date(2024, 6, 1));

    assert!(commands::engine_context(Some("02/28/2026"), Some(file.path())).is_err());
}

#[test]
fn test_engine_context_rejects_bad_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "request_timeout_secs = 0").unwrap();
    assert!(commands::engine_context(None, Some(file.path())).is_err());
}

// ========== Init / Status Tests ==========

#[test]
fn test_cmd_init_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tally.db");

    commands::cmd_init(&path, true).unwrap();
    assert!(path.exists());
    assert!(commands::cmd_status(&path, true).is_ok());
}

// ========== Report Tests ==========

#[test]
fn test_reports_render_in_both_formats() {
    let db = setup_test_db();
    let ctx = ctx();

    for output in [TABLE, JSON] {
        commands::cmd_balances(&db, &ctx, output).unwrap();
        commands::cmd_net_worth(&db, &ctx, output).unwrap();
        commands::cmd_budgets(&db, &ctx, output).unwrap();
        commands::cmd_insights(&db, &ctx, output).unwrap();
        commands::cmd_health(&db, &ctx, output).unwrap();
        commands::cmd_goals(&db, &ctx, output).unwrap();
        commands::cmd_scenario(&db, &ctx, "sofa", output).unwrap();
    }
}

#[test]
fn test_reports_on_empty_database() {
    let db = Database::in_memory().unwrap();
    let ctx = ctx();
    commands::cmd_balances(&db, &ctx, TABLE).unwrap();
    commands::cmd_budgets(&db, &ctx, TABLE).unwrap();
    commands::cmd_insights(&db, &ctx, TABLE).unwrap();
    commands::cmd_goals(&db, &ctx, TABLE).unwrap();
}

#[test]
fn test_cmd_scenario_not_found() {
    let db = setup_test_db();
    let err = commands::cmd_scenario(&db, &ctx(), "missing", TABLE).unwrap_err();
    assert!(err.to_string().contains("missing"));
}

// ========== Backup Tests ==========

#[test]
fn test_backup_export_and_restore() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("tally-backup.json.gz");
    let source = setup_test_db();
    commands::cmd_backup_export(&source, &file).unwrap();

    let target = Database::in_memory().unwrap();
    target
        .upsert(&Transaction {
            account: UNASSIGNED_ACCOUNT.to_string(),
            ..tx("stale", date(2020, 1, 1), 1.0, TransactionType::Expense, "Old")
        })
        .unwrap();
    commands::cmd_backup_restore(&target, &file, true).unwrap();

    let txs: Vec<Transaction> = target.list().unwrap();
    assert_eq!(txs.len(), 2);
    assert!(txs.iter().all(|t| t.id != "stale"));
    assert_eq!(target.list::<Budget>().unwrap().len(), 1);
}

#[test]
fn test_backup_restore_rejects_foreign_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("other.json");
    std::fs::write(&file, r#"{"format": "someone-else", "version": 1}"#).unwrap();

    let db = setup_test_db();
    assert!(commands::cmd_backup_restore(&db, &file, true).is_err());
    assert_eq!(db.list::<Transaction>().unwrap().len(), 2);
}

// ========== Feed Tests ==========

#[test]
fn test_cmd_feed_list_empty() {
    let db = Database::in_memory().unwrap();
    assert!(commands::cmd_feed_list(&db, TABLE).is_ok());
    assert!(commands::cmd_feed_list(&db, JSON).is_ok());
}

#[test]
fn test_cmd_feed_list_with_imported_rows() {
    let db = setup_test_db();
    db.upsert(&BankFeedConnection {
        connection_id: "conn-1".to_string(),
        provider: FeedProviderKind::SimpleFin,
        access_credential: "token".to_string(),
        institution_name: "Demo Bank".to_string(),
        status: ConnectionStatus::Linked,
        is_active: true,
        last_error: None,
        last_synced_at: None,
    })
    .unwrap();
    for (id, day) in [("t1", 2), ("t2", 3)] {
        db.upsert(&Transaction {
            origin: Origin::Imported,
            ..tx(
                &tally_core::feed::transaction_id("conn-1", "acc-1", id),
                date(2026, 3, day),
                12.0,
                TransactionType::Expense,
                "Dining",
            )
        })
        .unwrap();
    }

    assert!(commands::cmd_feed_list(&db, TABLE).is_ok());
    assert!(commands::cmd_feed_list(&db, JSON).is_ok());
}

#[tokio::test]
async fn test_cmd_feed_sync_requires_target() {
    let db = Database::in_memory().unwrap();
    let result = commands::cmd_feed_sync(db, ctx(), None, false, TABLE).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_feed_sync_unknown_connection() {
    let db = Database::in_memory().unwrap();
    let result = commands::cmd_feed_sync(db, ctx(), Some("nope"), false, TABLE).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_feed_link_rejects_unknown_provider() {
    let db = Database::in_memory().unwrap();
    let result = commands::cmd_feed_link(db, ctx(), "mint", "token", "", TABLE).await;
    assert!(result.is_err());
}
