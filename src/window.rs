//! Batch reclassification of a date window ("vacation mode"). Spending that
//! only ever happens inside the window is one-off and can be moved to a
//! single category; descriptions that also show up outside it are
//! recurring and stay untouched.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::error::{LedgerlyError, Result};
use crate::models::{Category, Transaction};
use crate::store::{RecordStore, UnitOfWork};

#[derive(Debug, Clone, PartialEq)]
pub struct WindowPlan {
    /// Unlocked in-window records whose description is window-exclusive.
    pub eligible: Vec<Transaction>,
    /// In-window descriptions also seen outside the window.
    pub protected: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowOutcome {
    pub eligible: usize,
    pub protected: usize,
    pub changed: usize,
}

fn check_bounds(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(LedgerlyError::Validation(format!(
            "window start {start} is after end {end}"
        )));
    }
    Ok(())
}

/// Descriptions occurring within `[start, end]` and never outside it.
pub fn window_exclusive_descriptions(
    store: &impl RecordStore,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BTreeSet<String>> {
    check_bounds(start, end)?;
    let mut inside = BTreeSet::new();
    let mut outside = BTreeSet::new();
    for txn in store.select_all()? {
        if txn.date >= start && txn.date <= end {
            inside.insert(txn.description);
        } else {
            outside.insert(txn.description);
        }
    }
    Ok(inside.difference(&outside).cloned().collect())
}

pub fn plan_window(store: &impl RecordStore, start: NaiveDate, end: NaiveDate) -> Result<WindowPlan> {
    let exclusive = window_exclusive_descriptions(store, start, end)?;
    let in_window = store.select_by_date_range(start, end)?;
    let protected: BTreeSet<String> = in_window
        .iter()
        .filter(|t| !exclusive.contains(&t.description))
        .map(|t| t.description.clone())
        .collect();
    let eligible = in_window
        .into_iter()
        .filter(|t| !t.is_manual && exclusive.contains(&t.description))
        .collect();
    Ok(WindowPlan {
        eligible,
        protected: protected.into_iter().collect(),
    })
}

/// Moves every eligible record to `category` and locks it, in one commit.
pub fn reclassify_window(
    store: &mut impl RecordStore,
    start: NaiveDate,
    end: NaiveDate,
    category: &str,
) -> Result<WindowOutcome> {
    let category = Category::parse(category)?;
    let plan = plan_window(store, start, end)?;

    let mut work = UnitOfWork::new();
    for txn in &plan.eligible {
        work.set_category(&txn.hash_id, Some(category.clone()), true);
    }
    let changed = store.commit(work)?;
    tracing::info!(
        "window {start}..{end}: {changed} records moved to {category}, {} descriptions protected",
        plan.protected.len()
    );
    Ok(WindowOutcome {
        eligible: plan.eligible.len(),
        protected: plan.protected.len(),
        changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::manual_update;
    use crate::store::MemoryStore;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        for (m, d, desc) in [
            (6, 10, "NETFLIX"),
            (7, 3, "HOTEL PRAIA"),
            (7, 5, "RESTAURANTE MAR"),
            (7, 6, "NETFLIX"),
            (7, 8, "HOTEL PRAIA"),
            (8, 2, "PADARIA"),
        ] {
            store
                .insert_if_absent(&Transaction::candidate(date(m, d), desc, -80.0, "CSV: a.csv"))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_window_exclusive_descriptions() {
        let store = seeded();
        let exclusive = window_exclusive_descriptions(&store, date(7, 1), date(7, 31)).unwrap();
        let exclusive: Vec<&str> = exclusive.iter().map(String::as_str).collect();
        assert_eq!(exclusive, vec!["HOTEL PRAIA", "RESTAURANTE MAR"]);
    }

    #[test]
    fn test_reclassify_window_protects_recurring() {
        let mut store = seeded();
        let outcome = reclassify_window(&mut store, date(7, 1), date(7, 31), "Travel").unwrap();
        assert_eq!(
            outcome,
            WindowOutcome {
                eligible: 3,
                protected: 1,
                changed: 3
            }
        );
        let all = store.select_all().unwrap();
        let netflix_in_window = all
            .iter()
            .find(|t| t.description == "NETFLIX" && t.date == date(7, 6))
            .unwrap();
        assert!(netflix_in_window.is_pending());
        assert!(all
            .iter()
            .filter(|t| t.description.starts_with("HOTEL") || t.description.starts_with("RESTAURANTE"))
            .all(|t| t.is_manual && t.category == Some(Category::Named("Travel".into()))));
    }

    #[test]
    fn test_reclassify_window_skips_locked_records() {
        let mut store = seeded();
        let hotel = store
            .select_all()
            .unwrap()
            .into_iter()
            .find(|t| t.description == "HOTEL PRAIA")
            .unwrap();
        manual_update(&mut store, &hotel.hash_id, "Business").unwrap();
        let outcome = reclassify_window(&mut store, date(7, 1), date(7, 31), "Travel").unwrap();
        assert_eq!(outcome.changed, 2);
        assert_eq!(
            store.get(&hotel.hash_id).unwrap().unwrap().category,
            Some(Category::Named("Business".into()))
        );
    }

    #[test]
    fn test_window_bounds_are_validated() {
        let mut store = seeded();
        assert!(matches!(
            reclassify_window(&mut store, date(8, 1), date(7, 1), "Travel"),
            Err(LedgerlyError::Validation(_))
        ));
        assert!(matches!(
            reclassify_window(&mut store, date(7, 1), date(7, 31), ""),
            Err(LedgerlyError::Validation(_))
        ));
    }
}
