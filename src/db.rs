use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{Category, Rule, Transaction};
use crate::store::{Mutation, RecordStore, UnitOfWork};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    hash_id TEXT PRIMARY KEY,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    source TEXT,
    category TEXT,
    is_manual INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

CREATE TABLE IF NOT EXISTS rules (
    id INTEGER PRIMARY KEY,
    match_term TEXT NOT NULL UNIQUE,
    target_category TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);
";

const TXN_COLUMNS: &str = "hash_id, date, description, amount, source, category, is_manual";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        hash_id: row.get(0)?,
        date: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        source: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        category: Category::from_stored(row.get(5)?),
        is_manual: row.get(6)?,
    })
}

/// SQLite-backed record store. Owns its connection; callers construct one and
/// pass it to the pipeline functions.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn query_transactions(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM transactions {filter} ORDER BY date, description, hash_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params, row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl RecordStore for SqliteStore {
    fn insert_if_absent(&mut self, txn: &Transaction) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO transactions (hash_id, date, description, amount, source, category, is_manual) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                txn.hash_id,
                txn.date,
                txn.description,
                txn.amount,
                txn.source,
                txn.category.as_ref().map(Category::label),
                txn.is_manual,
            ],
        )?;
        Ok(inserted == 1)
    }

    fn get(&self, hash_id: &str) -> Result<Option<Transaction>> {
        let sql = format!("SELECT {TXN_COLUMNS} FROM transactions WHERE hash_id = ?1");
        let txn = self
            .conn
            .query_row(&sql, [hash_id], row_to_transaction)
            .optional()?;
        Ok(txn)
    }

    fn select_all(&self) -> Result<Vec<Transaction>> {
        self.query_transactions("", [])
    }

    fn select_pending(&self) -> Result<Vec<Transaction>> {
        self.query_transactions("WHERE category IS NULL OR category = ''", [])
    }

    fn select_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Transaction>> {
        self.query_transactions("WHERE date BETWEEN ?1 AND ?2", params![start, end])
    }

    fn list_rules(&self) -> Result<Vec<Rule>> {
        let mut stmt = self
            .conn
            .prepare("SELECT match_term, target_category FROM rules ORDER BY match_term")?;
        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .filter_map(|(match_term, label)| {
                Category::parse(&label).ok().map(|target_category| Rule {
                    match_term,
                    target_category,
                })
            })
            .collect())
    }

    fn upsert_rule(&mut self, term: &str, category: &Category) -> Result<()> {
        self.conn.execute(
            "INSERT INTO rules (match_term, target_category) VALUES (?1, ?2) \
             ON CONFLICT(match_term) DO UPDATE SET target_category = excluded.target_category",
            params![term, category.label()],
        )?;
        Ok(())
    }

    fn delete_rule(&mut self, term: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM rules WHERE match_term = ?1", [term])?;
        Ok(removed > 0)
    }

    fn commit(&mut self, work: UnitOfWork) -> Result<usize> {
        if work.is_empty() {
            return Ok(0);
        }
        tracing::debug!("committing {} staged changes", work.len());
        let tx = self.conn.transaction()?;
        let mut changed = 0usize;
        for mutation in work.mutations() {
            changed += match mutation {
                Mutation::SetCategory {
                    hash_id,
                    category,
                    is_manual,
                } => tx.execute(
                    "UPDATE transactions SET category = ?1, is_manual = ?2 WHERE hash_id = ?3",
                    params![category.as_ref().map(Category::label), is_manual, hash_id],
                )?,
                Mutation::Rewrite {
                    hash_id,
                    amount,
                    description,
                    category,
                    is_manual,
                } => tx.execute(
                    "UPDATE transactions SET amount = ?1, description = ?2, \
                     category = COALESCE(?3, category), is_manual = ?4 WHERE hash_id = ?5",
                    params![
                        amount,
                        description,
                        category.as_ref().map(Category::label),
                        is_manual,
                        hash_id,
                    ],
                )?,
                Mutation::Delete { hash_id } => {
                    tx.execute("DELETE FROM transactions WHERE hash_id = ?1", [hash_id])?
                }
            };
        }
        tx.commit()?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn txn(day: u32, desc: &str, amount: f64) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2024, 2, day).unwrap();
        Transaction::candidate(date, desc, amount, "CSV: test.csv")
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, store) = test_db();
        let tables: Vec<String> = store
            .connection()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["transactions", "rules"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, store) = test_db();
        init_db(store.connection()).unwrap();
    }

    #[test]
    fn test_insert_if_absent_and_roundtrip_fields() {
        let (_dir, mut store) = test_db();
        let mut t = txn(3, "PADARIA", -8.9);
        t.category = Some(Category::Ignored);
        t.is_manual = true;
        assert!(store.insert_if_absent(&t).unwrap());
        assert!(!store.insert_if_absent(&t).unwrap());
        let loaded = store.get(&t.hash_id).unwrap().unwrap();
        assert_eq!(loaded, t);
    }

    #[test]
    fn test_select_pending_treats_empty_string_as_pending() {
        let (_dir, mut store) = test_db();
        let t = txn(3, "A", -1.0);
        store.insert_if_absent(&t).unwrap();
        store
            .connection()
            .execute("UPDATE transactions SET category = '' WHERE hash_id = ?1", [&t.hash_id])
            .unwrap();
        assert_eq!(store.select_pending().unwrap().len(), 1);
    }

    #[test]
    fn test_select_by_date_range_inclusive() {
        let (_dir, mut store) = test_db();
        for day in [1, 10, 20, 28] {
            store.insert_if_absent(&txn(day, "X", -1.0)).unwrap();
        }
        let start = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 20).unwrap();
        let rows = store.select_by_date_range(start, end).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, start);
    }

    #[test]
    fn test_rule_upsert_replaces_category() {
        let (_dir, mut store) = test_db();
        store.upsert_rule("UBER", &Category::Named("Taxi".into())).unwrap();
        store.upsert_rule("UBER", &Category::Named("Transport".into())).unwrap();
        let rules = store.list_rules().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].target_category.label(), "Transport");
    }

    #[test]
    fn test_rewrite_keeps_category_when_none() {
        let (_dir, mut store) = test_db();
        let mut t = txn(5, "STORE 01/02", -10.0);
        t.category = Some(Category::Named("Home".into()));
        store.insert_if_absent(&t).unwrap();
        let mut work = UnitOfWork::new();
        work.rewrite(&t.hash_id, -20.0, "STORE (Total 2x)", None, true);
        assert_eq!(store.commit(work).unwrap(), 1);
        let loaded = store.get(&t.hash_id).unwrap().unwrap();
        assert_eq!(loaded.amount, -20.0);
        assert_eq!(loaded.category, Some(Category::Named("Home".into())));
        assert!(loaded.is_manual);
    }

    #[test]
    fn test_commit_rolls_back_on_failure() {
        let (_dir, mut store) = test_db();
        let a = txn(1, "A", -1.0);
        let b = txn(2, "B", -2.0);
        store.insert_if_absent(&a).unwrap();
        store.insert_if_absent(&b).unwrap();
        store
            .connection()
            .execute_batch(&format!(
                "CREATE TRIGGER guard BEFORE DELETE ON transactions \
                 WHEN old.hash_id = '{}' BEGIN SELECT RAISE(ABORT, 'locked'); END;",
                b.hash_id
            ))
            .unwrap();

        let mut work = UnitOfWork::new();
        work.set_category(&a.hash_id, Some(Category::Named("Food".into())), true);
        work.delete(&b.hash_id);
        assert!(store.commit(work).is_err());

        let a = store.get(&a.hash_id).unwrap().unwrap();
        assert!(a.category.is_none());
        assert!(!a.is_manual);
    }

    #[test]
    fn test_delete_many() {
        let (_dir, mut store) = test_db();
        let a = txn(1, "A", -1.0);
        let b = txn(2, "B", -2.0);
        store.insert_if_absent(&a).unwrap();
        store.insert_if_absent(&b).unwrap();
        let removed = store
            .delete_many(&[a.hash_id.clone(), b.hash_id.clone(), "missing".into()])
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.select_all().unwrap().is_empty());
    }
}
