use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Category, Rule, Transaction};

/// A single staged change to a stored transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SetCategory {
        hash_id: String,
        category: Option<Category>,
        is_manual: bool,
    },
    /// Rewrites amount and description. A `None` category keeps the current one.
    Rewrite {
        hash_id: String,
        amount: f64,
        description: String,
        category: Option<Category>,
        is_manual: bool,
    },
    Delete {
        hash_id: String,
    },
}

/// Mutations staged for one atomic commit. Either every change lands or none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitOfWork {
    mutations: Vec<Mutation>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_category(&mut self, hash_id: &str, category: Option<Category>, is_manual: bool) {
        self.mutations.push(Mutation::SetCategory {
            hash_id: hash_id.to_string(),
            category,
            is_manual,
        });
    }

    pub fn rewrite(
        &mut self,
        hash_id: &str,
        amount: f64,
        description: &str,
        category: Option<Category>,
        is_manual: bool,
    ) {
        self.mutations.push(Mutation::Rewrite {
            hash_id: hash_id.to_string(),
            amount,
            description: description.to_string(),
            category,
            is_manual,
        });
    }

    pub fn delete(&mut self, hash_id: &str) {
        self.mutations.push(Mutation::Delete {
            hash_id: hash_id.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }
}

/// Persistence contract for transactions and classification rules.
pub trait RecordStore {
    /// Inserts unless a record with the same `hash_id` exists. Returns true
    /// when the record is new.
    fn insert_if_absent(&mut self, txn: &Transaction) -> Result<bool>;

    fn get(&self, hash_id: &str) -> Result<Option<Transaction>>;

    fn select_all(&self) -> Result<Vec<Transaction>>;

    /// Records whose category is empty.
    fn select_pending(&self) -> Result<Vec<Transaction>>;

    /// Records dated within `[start, end]`, both ends inclusive.
    fn select_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Transaction>>;

    fn list_rules(&self) -> Result<Vec<Rule>>;

    fn upsert_rule(&mut self, term: &str, category: &Category) -> Result<()>;

    /// Returns true when a rule was removed.
    fn delete_rule(&mut self, term: &str) -> Result<bool>;

    /// Applies every staged mutation atomically and returns the number of
    /// rows changed.
    fn commit(&mut self, work: UnitOfWork) -> Result<usize>;

    /// Returns true when the record exists.
    fn update_category(
        &mut self,
        hash_id: &str,
        category: Option<Category>,
        is_manual: bool,
    ) -> Result<bool> {
        let mut work = UnitOfWork::new();
        work.set_category(hash_id, category, is_manual);
        Ok(self.commit(work)? > 0)
    }

    fn delete(&mut self, hash_id: &str) -> Result<bool> {
        let mut work = UnitOfWork::new();
        work.delete(hash_id);
        Ok(self.commit(work)? > 0)
    }

    #[allow(dead_code)]
    fn delete_many(&mut self, hash_ids: &[String]) -> Result<usize> {
        let mut work = UnitOfWork::new();
        for id in hash_ids {
            work.delete(id);
        }
        self.commit(work)
    }
}

/// Ordering shared by every store: chronological, then by description.
pub(crate) fn ledger_order(a: &Transaction, b: &Transaction) -> std::cmp::Ordering {
    a.date
        .cmp(&b.date)
        .then_with(|| a.description.cmp(&b.description))
        .then_with(|| a.hash_id.cmp(&b.hash_id))
}

/// Store kept entirely in memory. Commits work on a copy that replaces the
/// live records only once every mutation applied.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, Transaction>,
    rules: BTreeMap<String, Category>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, keep: impl Fn(&Transaction) -> bool) -> Vec<Transaction> {
        let mut rows: Vec<Transaction> = self.records.values().filter(|t| keep(t)).cloned().collect();
        rows.sort_by(ledger_order);
        rows
    }
}

impl RecordStore for MemoryStore {
    fn insert_if_absent(&mut self, txn: &Transaction) -> Result<bool> {
        if self.records.contains_key(&txn.hash_id) {
            return Ok(false);
        }
        self.records.insert(txn.hash_id.clone(), txn.clone());
        Ok(true)
    }

    fn get(&self, hash_id: &str) -> Result<Option<Transaction>> {
        Ok(self.records.get(hash_id).cloned())
    }

    fn select_all(&self) -> Result<Vec<Transaction>> {
        Ok(self.sorted(|_| true))
    }

    fn select_pending(&self) -> Result<Vec<Transaction>> {
        Ok(self.sorted(Transaction::is_pending))
    }

    fn select_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Transaction>> {
        Ok(self.sorted(|t| t.date >= start && t.date <= end))
    }

    fn list_rules(&self) -> Result<Vec<Rule>> {
        Ok(self
            .rules
            .iter()
            .map(|(term, category)| Rule {
                match_term: term.clone(),
                target_category: category.clone(),
            })
            .collect())
    }

    fn upsert_rule(&mut self, term: &str, category: &Category) -> Result<()> {
        self.rules.insert(term.to_string(), category.clone());
        Ok(())
    }

    fn delete_rule(&mut self, term: &str) -> Result<bool> {
        Ok(self.rules.remove(term).is_some())
    }

    fn commit(&mut self, work: UnitOfWork) -> Result<usize> {
        let mut staged = self.records.clone();
        let mut changed = 0usize;
        for mutation in work.mutations {
            match mutation {
                Mutation::SetCategory {
                    hash_id,
                    category,
                    is_manual,
                } => {
                    if let Some(txn) = staged.get_mut(&hash_id) {
                        txn.category = category;
                        txn.is_manual = is_manual;
                        changed += 1;
                    }
                }
                Mutation::Rewrite {
                    hash_id,
                    amount,
                    description,
                    category,
                    is_manual,
                } => {
                    if let Some(txn) = staged.get_mut(&hash_id) {
                        txn.amount = amount;
                        txn.description = description;
                        if category.is_some() {
                            txn.category = category;
                        }
                        txn.is_manual = is_manual;
                        changed += 1;
                    }
                }
                Mutation::Delete { hash_id } => {
                    if staged.remove(&hash_id).is_some() {
                        changed += 1;
                    }
                }
            }
        }
        self.records = staged;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(day: u32, desc: &str, amount: f64) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        Transaction::candidate(date, desc, amount, "test")
    }

    #[test]
    fn test_insert_if_absent_rejects_same_fingerprint() {
        let mut store = MemoryStore::new();
        assert!(store.insert_if_absent(&txn(1, "A", -1.0)).unwrap());
        assert!(!store.insert_if_absent(&txn(1, "A", -1.0)).unwrap());
        assert_eq!(store.select_all().unwrap().len(), 1);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let mut store = MemoryStore::new();
        for day in [1, 5, 10, 15] {
            store.insert_if_absent(&txn(day, "X", -1.0)).unwrap();
        }
        let start = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(store.select_by_date_range(start, end).unwrap().len(), 2);
    }

    #[test]
    fn test_commit_applies_all_mutations() {
        let mut store = MemoryStore::new();
        let a = txn(1, "A", -1.0);
        let b = txn(2, "B", -2.0);
        store.insert_if_absent(&a).unwrap();
        store.insert_if_absent(&b).unwrap();

        let mut work = UnitOfWork::new();
        work.set_category(&a.hash_id, Some(Category::Named("Food".into())), false);
        work.rewrite(&b.hash_id, -6.0, "B (Total 3x)", None, true);
        work.delete("missing");
        assert_eq!(work.len(), 3);
        assert_eq!(store.commit(work).unwrap(), 2);

        let b = store.get(&b.hash_id).unwrap().unwrap();
        assert_eq!(b.amount, -6.0);
        assert!(b.is_manual);
        assert!(b.category.is_none());
        assert_eq!(store.select_pending().unwrap().len(), 1);
    }

    #[test]
    fn test_default_update_category_reports_missing() {
        let mut store = MemoryStore::new();
        assert!(!store.update_category("nope", None, true).unwrap());
    }

    #[test]
    fn test_rules_upsert_by_term() {
        let mut store = MemoryStore::new();
        store.upsert_rule("UBER", &Category::Named("Taxi".into())).unwrap();
        store.upsert_rule("UBER", &Category::Named("Transport".into())).unwrap();
        let rules = store.list_rules().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].target_category, Category::Named("Transport".into()));
        assert!(store.delete_rule("UBER").unwrap());
        assert!(!store.delete_rule("UBER").unwrap());
    }
}
