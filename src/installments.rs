//! Split-payment detection. Statements post each installment of a purchase
//! as its own entry; these helpers fold them back into one record carrying
//! the full value at the first installment.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{LedgerlyError, Result};
use crate::fingerprint::round_cents;
use crate::models::{Category, Transaction};
use crate::store::{RecordStore, UnitOfWork};

/// Default allowance when comparing sibling installment amounts.
pub const DEFAULT_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallmentTag {
    pub current: u32,
    pub total: u32,
    /// Description with the installment notation removed.
    pub base: String,
}

impl InstallmentTag {
    pub fn is_head(&self) -> bool {
        self.current == 1 && self.total > 1
    }

    fn key(&self) -> String {
        self.base.to_lowercase()
    }

    pub fn annotated(&self) -> String {
        format!("{} (Total {}x)", self.base, self.total)
    }

    pub fn full_value(&self, per_installment: f64) -> f64 {
        round_cents(per_installment * f64::from(self.total))
    }
}

fn notation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:\bPARC(?:ELA)?\.?\s*)?\b(\d{1,3})(?:\s*/\s*|\s+(?:DE|OF)\s+)(\d{1,3})\b")
            .expect("static pattern")
    })
}

fn clean_base(description: &str, start: usize, end: usize) -> String {
    let stripped = format!("{} {}", &description[..start], &description[end..])
        .replace("( )", "")
        .replace("()", "");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ':' | '/' | '(' | ','))
        .to_string()
}

/// Recognizes "current / total" notation (`01/03`, `PARC 1/3`,
/// `PARCELA 1 DE 3`, `2 of 6`). The last valid occurrence wins.
pub fn detect(description: &str) -> Option<InstallmentTag> {
    notation()
        .captures_iter(description)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let current: u32 = caps[1].parse().ok()?;
            let total: u32 = caps[2].parse().ok()?;
            if current == 0 || total < 2 || current > total {
                return None;
            }
            Some(InstallmentTag {
                current,
                total,
                base: clean_base(description, whole.start(), whole.end()),
            })
        })
        .last()
        .filter(|tag| !tag.base.is_empty())
}

// ---------------------------------------------------------------------------
// Interactive path
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct UnificationOffer {
    pub hash_id: String,
    pub tag: InstallmentTag,
    pub per_installment: f64,
    pub full_value: f64,
    pub description: String,
}

/// Offers unification when the record is a pending, unlocked first
/// installment of several. Projected loan plans and merged heads are locked.
pub fn offer_unification(txn: &Transaction) -> Option<UnificationOffer> {
    if txn.is_manual || !txn.is_pending() {
        return None;
    }
    let tag = detect(&txn.description).filter(InstallmentTag::is_head)?;
    Some(UnificationOffer {
        hash_id: txn.hash_id.clone(),
        full_value: tag.full_value(txn.amount),
        description: tag.annotated(),
        per_installment: txn.amount,
        tag,
    })
}

/// Rewrites the offered record to its full value and locks it. The optional
/// category lands in the same commit.
pub fn apply_unification(
    store: &mut impl RecordStore,
    offer: &UnificationOffer,
    category: Option<Category>,
) -> Result<()> {
    let mut work = UnitOfWork::new();
    work.rewrite(&offer.hash_id, offer.full_value, &offer.description, category, true);
    if store.commit(work)? == 0 {
        return Err(LedgerlyError::UnknownTransaction(offer.hash_id.clone()));
    }
    tracing::info!(
        "unified {} into {:.2} ({}x)",
        offer.hash_id,
        offer.full_value,
        offer.tag.total
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Batch path
// ---------------------------------------------------------------------------

struct UnificationPlan {
    /// (record index, tag, full value)
    heads: Vec<(usize, InstallmentTag, f64)>,
    suppressed: Vec<usize>,
    unmatched: usize,
}

fn plan_unification(records: &[Transaction], tolerance: f64) -> UnificationPlan {
    let tags: Vec<Option<InstallmentTag>> = records.iter().map(|r| detect(&r.description)).collect();
    let mut removed = vec![false; records.len()];
    let mut heads = Vec::new();
    let mut suppressed = Vec::new();

    for (i, tag) in tags.iter().enumerate() {
        let Some(tag) = tag.as_ref().filter(|t| t.is_head()) else {
            continue;
        };
        let per_installment = records[i].amount;
        let key = tag.key();
        for (j, other) in tags.iter().enumerate() {
            let Some(other) = other else { continue };
            if removed[j] || other.current <= 1 || other.key() != key {
                continue;
            }
            if (records[j].amount - per_installment).abs() <= tolerance + f64::EPSILON {
                removed[j] = true;
                suppressed.push(j);
            }
        }
        heads.push((i, tag.clone(), tag.full_value(per_installment)));
    }

    let unmatched = tags
        .iter()
        .enumerate()
        .filter(|(i, tag)| {
            tag.as_ref().is_some_and(|t| !t.is_head()) && !removed[*i]
        })
        .count();

    UnificationPlan {
        heads,
        suppressed,
        unmatched,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnifyOutcome {
    pub records: Vec<Transaction>,
    pub unified: usize,
    pub suppressed: usize,
    /// Installment-notated records that were neither a head nor a sibling.
    pub unmatched: usize,
}

/// Folds installment siblings within one batch of candidates (e.g. one
/// imported file) into their first installment.
pub fn unify_batch(records: Vec<Transaction>, tolerance: f64) -> UnifyOutcome {
    let plan = plan_unification(&records, tolerance);
    let mut records = records;
    for (i, tag, full_value) in &plan.heads {
        let head = &mut records[*i];
        head.amount = *full_value;
        head.description = tag.annotated();
        head.is_manual = true;
    }
    let mut suppressed = plan.suppressed.clone();
    suppressed.sort_unstable();
    for i in suppressed.into_iter().rev() {
        records.remove(i);
    }

    if !plan.heads.is_empty() || plan.unmatched > 0 {
        tracing::info!(
            "installments: {} unified, {} siblings suppressed, {} unmatched",
            plan.heads.len(),
            plan.suppressed.len(),
            plan.unmatched
        );
    }
    UnifyOutcome {
        records,
        unified: plan.heads.len(),
        suppressed: plan.suppressed.len(),
        unmatched: plan.unmatched,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoredUnifyOutcome {
    pub unified: usize,
    pub suppressed: usize,
    pub unmatched: usize,
}

/// Runs the batch algorithm over already stored records and commits head
/// rewrites and sibling deletions together. Locked records are left out.
pub fn unify_stored(
    store: &mut impl RecordStore,
    records: &[Transaction],
    tolerance: f64,
) -> Result<StoredUnifyOutcome> {
    let records: Vec<Transaction> = records.iter().filter(|t| !t.is_manual).cloned().collect();
    let plan = plan_unification(&records, tolerance);

    let mut work = UnitOfWork::new();
    for (i, tag, full_value) in &plan.heads {
        work.rewrite(&records[*i].hash_id, *full_value, &tag.annotated(), None, true);
    }
    for i in &plan.suppressed {
        work.delete(&records[*i].hash_id);
    }
    store.commit(work)?;

    tracing::info!(
        "stored installments: {} unified, {} siblings removed, {} unmatched",
        plan.heads.len(),
        plan.suppressed.len(),
        plan.unmatched
    );
    Ok(StoredUnifyOutcome {
        unified: plan.heads.len(),
        suppressed: plan.suppressed.len(),
        unmatched: plan.unmatched,
    })
}
