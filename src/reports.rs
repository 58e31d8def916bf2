use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::error::{LedgerlyError, Result};
use crate::models::{Category, Transaction};
use crate::store::RecordStore;

/// Share of income the savings target asks for.
pub const SAVINGS_TARGET_RATE: f64 = 0.10;

fn counts_in_reports(txn: &Transaction) -> bool {
    !txn.category.as_ref().is_some_and(Category::is_ignored)
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerStatus {
    pub total: usize,
    pub pending: usize,
    pub rules: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

pub fn ledger_status(store: &impl RecordStore) -> Result<LedgerStatus> {
    let all = store.select_all()?;
    Ok(LedgerStatus {
        total: all.len(),
        pending: all.iter().filter(|t| t.is_pending()).count(),
        rules: store.list_rules()?.len(),
        first_date: all.iter().map(|t| t.date).min(),
        last_date: all.iter().map(|t| t.date).max(),
    })
}

// ---------------------------------------------------------------------------
// Period summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCost {
    /// `None` groups outflows that are still pending.
    pub category: Option<Category>,
    /// Outflow total for the period, as a positive number.
    pub total: f64,
    pub monthly: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub income: f64,
    /// Sum of outflows (negative).
    pub expenses: f64,
    pub balance: f64,
    /// Percent of income kept; zero without income.
    pub savings_rate: f64,
    pub savings_target: f64,
    /// Normalization factor: period length in 30-day months, at least 1.
    pub months: f64,
    pub categories: Vec<CategoryCost>,
}

pub fn period_summary(store: &impl RecordStore, start: NaiveDate, end: NaiveDate) -> Result<PeriodSummary> {
    if start > end {
        return Err(LedgerlyError::Validation(format!(
            "period start {start} is after end {end}"
        )));
    }
    let records: Vec<Transaction> = store
        .select_by_date_range(start, end)?
        .into_iter()
        .filter(counts_in_reports)
        .collect();

    let days = (end - start).num_days() as f64;
    let months = (days / 30.0).max(1.0);

    let income: f64 = records.iter().filter(|t| t.amount > 0.0).map(|t| t.amount).sum();
    let expenses: f64 = records.iter().filter(|t| t.amount < 0.0).map(|t| t.amount).sum();
    let balance = income + expenses;
    let savings_rate = if income > 0.0 { balance / income * 100.0 } else { 0.0 };

    let mut totals: HashMap<Option<Category>, f64> = HashMap::new();
    for txn in records.iter().filter(|t| t.amount < 0.0) {
        *totals.entry(txn.category.clone()).or_default() += txn.amount.abs();
    }
    let mut categories: Vec<CategoryCost> = totals
        .into_iter()
        .map(|(category, total)| CategoryCost {
            category,
            total,
            monthly: total / months,
        })
        .collect();
    categories.sort_by(|a, b| {
        b.monthly
            .total_cmp(&a.monthly)
            .then_with(|| a.category.cmp(&b.category))
    });

    Ok(PeriodSummary {
        income,
        expenses,
        balance,
        savings_rate,
        savings_target: income * SAVINGS_TARGET_RATE,
        months,
        categories,
    })
}

// ---------------------------------------------------------------------------
// Liability radar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyLiability {
    /// `YYYY-MM`
    pub month: String,
    /// Committed outflow for the month, as a positive number.
    pub total: f64,
}

/// Outflows already committed after `today`, per calendar month.
pub fn liability_radar(store: &impl RecordStore, today: NaiveDate) -> Result<Vec<MonthlyLiability>> {
    let mut months: BTreeMap<String, f64> = BTreeMap::new();
    for txn in store
        .select_all()?
        .iter()
        .filter(|t| t.date > today && t.amount < 0.0 && counts_in_reports(t))
    {
        *months.entry(txn.date.format("%Y-%m").to_string()).or_default() += txn.amount.abs();
    }
    Ok(months
        .into_iter()
        .map(|(month, total)| MonthlyLiability { month, total })
        .collect())
}
