use chrono::{Months, NaiveDate};

use crate::error::{LedgerlyError, Result};
use crate::importer::save_batch;
use crate::models::{Category, Transaction, LOANS_CATEGORY};
use crate::store::RecordStore;

pub const LOAN_SOURCE: &str = "Loan contract";

/// Projects `count` monthly installments starting at `first_due`. Dates are
/// offset from the first due date, so a day past the end of a short month
/// is clamped for that month only.
pub fn generate_plan(
    name: &str,
    per_installment_amount: f64,
    first_due: NaiveDate,
    count: u32,
) -> Result<Vec<Transaction>> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerlyError::Validation("loan name must not be empty".into()));
    }
    if per_installment_amount == 0.0 || !per_installment_amount.is_finite() {
        return Err(LedgerlyError::Validation(
            "installment amount must be a non-zero number".into(),
        ));
    }
    if count == 0 {
        return Err(LedgerlyError::Validation(
            "installment count must be at least 1".into(),
        ));
    }

    let amount = -per_installment_amount.abs();
    (0..count)
        .map(|i| {
            let date = first_due.checked_add_months(Months::new(i)).ok_or_else(|| {
                LedgerlyError::Validation(format!("installment {} falls outside the calendar", i + 1))
            })?;
            let description = format!("{name} ({:02}/{count})", i + 1);
            let mut txn = Transaction::candidate(date, &description, amount, LOAN_SOURCE);
            txn.category = Some(Category::Named(LOANS_CATEGORY.to_string()));
            txn.is_manual = true;
            Ok(txn)
        })
        .collect()
}

/// Returns the number of installments that were not stored yet.
pub fn save_plan(store: &mut impl RecordStore, plan: &[Transaction]) -> Result<usize> {
    let summary = save_batch(store, plan)?;
    tracing::info!(
        "loan plan: {} installments, {} new, {} already stored",
        summary.read,
        summary.saved,
        summary.duplicates()
    );
    Ok(summary.saved)
}
