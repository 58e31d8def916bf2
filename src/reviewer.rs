use std::collections::HashMap;

use crate::categorizer::create_rule;
use crate::error::Result;
use crate::models::{Category, Transaction};
use crate::store::{RecordStore, UnitOfWork};

/// Pending records sharing one exact description.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingGroup {
    pub description: String,
    pub records: Vec<Transaction>,
}

impl PendingGroup {
    pub fn total(&self) -> f64 {
        self.records.iter().map(|t| t.amount).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Save the description as a rule term and run a classification pass.
    /// Locked records of the group (merged installment heads) take the
    /// category by hand, since rules never touch them.
    LearnRule,
    /// Lock each record of the group without teaching a rule.
    ManualOnly,
}

/// Groups pending records by description, most frequent first.
pub fn pending_groups(store: &impl RecordStore) -> Result<Vec<PendingGroup>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<PendingGroup> = Vec::new();
    for txn in store.select_pending()? {
        match index.get(&txn.description) {
            Some(&i) => groups[i].records.push(txn),
            None => {
                index.insert(txn.description.clone(), groups.len());
                groups.push(PendingGroup {
                    description: txn.description.clone(),
                    records: vec![txn],
                });
            }
        }
    }
    groups.sort_by(|a, b| {
        b.records
            .len()
            .cmp(&a.records.len())
            .then_with(|| a.description.cmp(&b.description))
    });
    Ok(groups)
}

/// Classifies every pending record with this description. Returns the number
/// of records changed.
pub fn resolve_group(
    store: &mut impl RecordStore,
    description: &str,
    category: &str,
    mode: ResolveMode,
) -> Result<usize> {
    match mode {
        ResolveMode::LearnRule => {
            let target = Category::parse(category)?;
            let locked: Vec<String> = store
                .select_pending()?
                .into_iter()
                .filter(|t| t.is_manual && t.description == description)
                .map(|t| t.hash_id)
                .collect();
            let classified = create_rule(store, description, category)?;
            let mut work = UnitOfWork::new();
            for hash_id in &locked {
                work.set_category(hash_id, Some(target.clone()), true);
            }
            Ok(classified + store.commit(work)?)
        }
        ResolveMode::ManualOnly => {
            let category = Category::parse(category)?;
            let mut work = UnitOfWork::new();
            for txn in store
                .select_pending()?
                .iter()
                .filter(|t| t.description == description)
            {
                work.set_category(&txn.hash_id, Some(category.clone()), true);
            }
            store.commit(work)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerlyError;
    use crate::installments::{unify_batch, DEFAULT_TOLERANCE};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn store_with(entries: &[(u32, &str)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (day, desc) in entries {
            let date = NaiveDate::from_ymd_opt(2024, 6, *day).unwrap();
            store
                .insert_if_absent(&Transaction::candidate(date, desc, -12.0, "CSV: a.csv"))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_pending_groups_most_frequent_first() {
        let store = store_with(&[(1, "IFOOD"), (2, "UBER"), (3, "IFOOD"), (4, "IFOOD"), (5, "UBER"), (6, "ZARA")]);
        let groups = pending_groups(&store).unwrap();
        let summary: Vec<(&str, usize)> = groups
            .iter()
            .map(|g| (g.description.as_str(), g.records.len()))
            .collect();
        assert_eq!(summary, vec![("IFOOD", 3), ("UBER", 2), ("ZARA", 1)]);
        assert_eq!(groups[0].total(), -36.0);
    }

    #[test]
    fn test_resolve_group_learn_rule() {
        let mut store = store_with(&[(1, "IFOOD"), (2, "IFOOD"), (3, "IFOOD *DELIVERY")]);
        let changed = resolve_group(&mut store, "IFOOD", "Food", ResolveMode::LearnRule).unwrap();
        assert_eq!(changed, 3);
        assert_eq!(store.list_rules().unwrap().len(), 1);
        assert!(store.select_all().unwrap().iter().all(|t| !t.is_manual));
    }

    #[test]
    fn test_resolve_group_learn_rule_classifies_merged_head() {
        let mut store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let batch = vec![
            Transaction::candidate(date, "STORE 01/03", -10.0, "Card: f.txt"),
            Transaction::candidate(date, "STORE 02/03", -10.0, "Card: f.txt"),
        ];
        for txn in unify_batch(batch, DEFAULT_TOLERANCE).records {
            store.insert_if_absent(&txn).unwrap();
        }
        let groups = pending_groups(&store).unwrap();
        assert_eq!(groups[0].description, "STORE (Total 3x)");

        let changed = resolve_group(&mut store, "STORE (Total 3x)", "Shopping", ResolveMode::LearnRule).unwrap();
        assert_eq!(changed, 1);
        assert!(pending_groups(&store).unwrap().is_empty());
        let all = store.select_all().unwrap();
        let head = &all[0];
        assert_eq!(head.category, Some(Category::Named("Shopping".into())));
        assert!(head.is_manual);
        assert_eq!(head.amount, -30.0);
        assert_eq!(store.list_rules().unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_group_manual_only() {
        let mut store = store_with(&[(1, "PIX JOAO"), (2, "PIX JOAO"), (3, "PIX JOAO SILVA")]);
        let changed = resolve_group(&mut store, "PIX JOAO", "Family", ResolveMode::ManualOnly).unwrap();
        assert_eq!(changed, 2);
        assert!(store.list_rules().unwrap().is_empty());
        let groups = pending_groups(&store).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].description, "PIX JOAO SILVA");
        assert!(store
            .select_all()
            .unwrap()
            .iter()
            .filter(|t| t.description == "PIX JOAO")
            .all(|t| t.is_manual));
    }

    #[test]
    fn test_resolve_group_rejects_blank_category() {
        let mut store = store_with(&[(1, "IFOOD")]);
        for mode in [ResolveMode::LearnRule, ResolveMode::ManualOnly] {
            let err = resolve_group(&mut store, "IFOOD", "  ", mode).unwrap_err();
            assert!(matches!(err, LedgerlyError::Validation(_)));
        }
        assert_eq!(pending_groups(&store).unwrap().len(), 1);
    }
}
