//! RecordStore implementation over the `records` table

use rusqlite::{params, OptionalExtension, Transaction as SqlTransaction};
use tracing::{debug, warn};

use super::Database;
use crate::error::Result;
use crate::models::UiPreferences;
use crate::store::{Collection, Record, RecordStore, WriteBatch, WriteOp};

const UI_PREFERENCES_KEY: &str = "ui_preferences";

fn apply_ops(tx: &SqlTransaction<'_>, batch: &WriteBatch) -> Result<()> {
    for op in batch.ops() {
        match op {
            WriteOp::Upsert {
                collection,
                id,
                date,
                data,
            } => {
                tx.execute(
                    "INSERT INTO records (collection, id, date, data) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(collection, id) DO UPDATE SET
                        date = excluded.date,
                        data = excluded.data,
                        updated_at = CURRENT_TIMESTAMP",
                    params![
                        collection.as_str(),
                        id,
                        date.map(|d| d.format("%Y-%m-%d").to_string()),
                        serde_json::to_string(data)?
                    ],
                )?;
            }
            WriteOp::Delete { collection, id } => {
                tx.execute(
                    "DELETE FROM records WHERE collection = ?1 AND id = ?2",
                    params![collection.as_str(), id],
                )?;
            }
            WriteOp::SetUiPreferences(value) => {
                tx.execute(
                    "INSERT INTO settings (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                        updated_at = CURRENT_TIMESTAMP",
                    params![UI_PREFERENCES_KEY, serde_json::to_string(value)?],
                )?;
            }
        }
    }
    Ok(())
}

impl RecordStore for Database {
    fn list<R: Record>(&self) -> Result<Vec<R>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, data FROM records WHERE collection = ? ORDER BY rowid")?;

        let rows = stmt
            .query_map(params![R::COLLECTION.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, data) in rows {
            match serde_json::from_str::<R>(&data) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        collection = %R::COLLECTION,
                        id = %id,
                        error = %e,
                        "Skipping record with unknown shape"
                    );
                }
            }
        }
        Ok(records)
    }

    fn get<R: Record>(&self, id: &str) -> Result<Option<R>> {
        let conn = self.conn()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM records WHERE collection = ?1 AND id = ?2",
                params![R::COLLECTION.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    fn delete<R: Record>(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![R::COLLECTION.as_str(), id],
        )?;
        Ok(removed > 0)
    }

    fn apply(&self, batch: &WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        apply_ops(&tx, batch)?;
        tx.commit()?;
        debug!(ops = batch.len(), "Applied write batch");
        Ok(())
    }

    fn replace(&self, clear: &[Collection], batch: &WriteBatch) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for collection in clear {
            tx.execute(
                "DELETE FROM records WHERE collection = ?1",
                params![collection.as_str()],
            )?;
        }
        apply_ops(&tx, batch)?;
        tx.commit()?;
        debug!(
            cleared = clear.len(),
            ops = batch.len(),
            "Replaced collections"
        );
        Ok(())
    }

    fn get_ui_preferences(&self) -> Result<UiPreferences> {
        let conn = self.conn()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![UI_PREFERENCES_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(v) => Ok(serde_json::from_str(&v)?),
            None => Ok(UiPreferences::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AccountPatch, Bank, Origin, Transaction, TransactionPatch, TransactionType,
    };
    use chrono::NaiveDate;

    fn tx(id: &str, amount: f64) -> Transaction {
        Transaction {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
            amount,
            kind: TransactionType::Expense,
            category: "Groceries".into(),
            merchant: "Market".into(),
            account: "unassigned".into(),
            note: String::new(),
            recurring: false,
            origin: Origin::Manual,
        }
    }

    fn bank(id: &str, balance: f64) -> Bank {
        Bank {
            id: id.to_string(),
            name: "Checking".into(),
            institution: None,
            current_balance: balance,
            available_balance: None,
            apy: None,
            last_updated: None,
        }
    }

    #[test]
    fn test_upsert_list_preserves_insertion_order() {
        let db = Database::in_memory().unwrap();
        db.upsert(&tx("b", 1.0)).unwrap();
        db.upsert(&tx("a", 2.0)).unwrap();
        // Updating an existing record keeps its position
        db.upsert(&tx("b", 3.0)).unwrap();

        let listed: Vec<Transaction> = db.list().unwrap();
        let ids: Vec<_> = listed.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(listed[0].amount, 3.0);
    }

    #[test]
    fn test_collections_are_separate() {
        let db = Database::in_memory().unwrap();
        db.upsert(&tx("x", 1.0)).unwrap();
        db.upsert(&bank("x", 50.0)).unwrap();

        assert_eq!(db.list::<Transaction>().unwrap().len(), 1);
        assert_eq!(db.list::<Bank>().unwrap().len(), 1);
        assert!(db.delete::<Bank>("x").unwrap());
        assert!(!db.delete::<Bank>("x").unwrap());
        assert!(db.get::<Transaction>("x").unwrap().is_some());
    }

    #[test]
    fn test_failed_batch_commits_nothing() {
        let db = Database::in_memory().unwrap();
        db.upsert(&tx("keep", 1.0)).unwrap();

        // Drop the table out from under a batch to force a mid-batch failure
        let mut batch = WriteBatch::new();
        batch.upsert(&tx("new", 5.0)).unwrap();
        batch.delete::<Transaction>("keep");
        batch
            .set_ui_preferences(&UiPreferences::default())
            .unwrap();
        db.conn()
            .unwrap()
            .execute_batch("DROP TABLE settings;")
            .unwrap();

        assert!(db.apply(&batch).is_err());
        let ids: Vec<_> = db
            .list::<Transaction>()
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["keep".to_string()]);
    }

    #[test]
    fn test_replace_clears_then_inserts() {
        let db = Database::in_memory().unwrap();
        db.upsert(&tx("old", 1.0)).unwrap();
        db.upsert(&bank("b1", 10.0)).unwrap();

        let mut batch = WriteBatch::new();
        batch.upsert(&tx("new", 2.0)).unwrap();
        db.replace(&[Collection::Transactions], &batch).unwrap();

        let txs: Vec<Transaction> = db.list().unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].id, "new");
        // Untouched collection survives
        assert_eq!(db.list::<Bank>().unwrap().len(), 1);
    }

    #[test]
    fn test_ui_preferences_roundtrip() {
        let db = Database::in_memory().unwrap();
        assert!(db.get_ui_preferences().unwrap().values.is_empty());

        let mut prefs = UiPreferences::default();
        prefs
            .values
            .insert("theme".into(), serde_json::json!("dark"));
        db.set_ui_preferences(&prefs).unwrap();
        assert_eq!(db.get_ui_preferences().unwrap(), prefs);
    }

    #[test]
    fn test_patches_validate_before_merge() {
        let db = Database::in_memory().unwrap();
        db.upsert(&tx("t1", 20.0)).unwrap();
        db.upsert(&bank("b1", 100.0)).unwrap();

        let bad = TransactionPatch {
            amount: Some(f64::NAN),
            ..Default::default()
        };
        assert!(db.update_transaction("t1", &bad).is_err());
        assert_eq!(db.get::<Transaction>("t1").unwrap().unwrap().amount, 20.0);

        let updated = db
            .update_account(
                "b1",
                &AccountPatch {
                    balance: Some(75.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.anchor_balance(), 75.0);
        assert_eq!(db.get::<Bank>("b1").unwrap().unwrap().current_balance, 75.0);

        assert!(db
            .update_account("missing", &AccountPatch::default())
            .is_err());
    }
}
