use std::collections::BTreeSet;

use crate::error::{LedgerlyError, Result};
use crate::models::{Category, Rule};
use crate::store::{RecordStore, UnitOfWork};

/// Longer terms are more specific and claim a record first; ties go by term
/// so a pass is reproducible.
fn evaluation_order(mut rules: Vec<Rule>) -> Vec<Rule> {
    rules.sort_by(|a, b| {
        b.match_term
            .chars()
            .count()
            .cmp(&a.match_term.chars().count())
            .then_with(|| a.match_term.cmp(&b.match_term))
    });
    rules
}

/// Fills the category of every pending, unlocked record matched by a rule.
/// Returns the number of records classified.
pub fn run_auto_classification(store: &mut impl RecordStore) -> Result<usize> {
    let rules = evaluation_order(store.list_rules()?);
    if rules.is_empty() {
        return Ok(0);
    }
    let pending = store.select_pending()?;

    let mut work = UnitOfWork::new();
    for txn in pending.iter().filter(|t| !t.is_manual) {
        if let Some(rule) = rules.iter().find(|r| r.matches(&txn.description)) {
            work.set_category(&txn.hash_id, Some(rule.target_category.clone()), false);
        }
    }
    if work.is_empty() {
        return Ok(0);
    }
    let changed = store.commit(work)?;
    tracing::info!("classified {changed} of {} pending records", pending.len());
    Ok(changed)
}

fn validated_term(term: &str) -> Result<&str> {
    let term = term.trim();
    if term.is_empty() {
        return Err(LedgerlyError::Validation("rule term must not be empty".into()));
    }
    Ok(term)
}

/// Saves the rule (replacing any rule with the same term) and applies the
/// whole rule set right away. Returns records classified by that pass.
pub fn create_rule(store: &mut impl RecordStore, term: &str, category: &str) -> Result<usize> {
    let term = validated_term(term)?;
    let category = Category::parse(category)?;
    store.upsert_rule(term, &category)?;
    tracing::info!("rule {term:?} -> {category}");
    run_auto_classification(store)
}

/// Classifies one record by hand and locks it against automated changes.
pub fn manual_update(store: &mut impl RecordStore, hash_id: &str, category: &str) -> Result<()> {
    let category = Category::parse(category)?;
    if !store.update_category(hash_id, Some(category), true)? {
        return Err(LedgerlyError::UnknownTransaction(hash_id.to_string()));
    }
    Ok(())
}

/// Categories already assigned stay as they are.
pub fn delete_rule(store: &mut impl RecordStore, term: &str) -> Result<bool> {
    let term = validated_term(term)?;
    store.delete_rule(term)
}

pub fn pending_count(store: &impl RecordStore) -> Result<usize> {
    Ok(store.select_pending()?.len())
}

/// Distinct labels in use by records and rules, sorted.
pub fn known_categories(store: &impl RecordStore) -> Result<Vec<String>> {
    let mut labels: BTreeSet<String> = store
        .select_all()?
        .into_iter()
        .filter_map(|t| t.category)
        .map(|c| c.label().to_string())
        .collect();
    labels.extend(
        store
            .list_rules()?
            .into_iter()
            .map(|r| r.target_category.label().to_string()),
    );
    Ok(labels.into_iter().collect())
}
