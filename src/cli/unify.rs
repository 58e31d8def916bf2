use super::{resolve_hash, Context};
use crate::error::{LedgerlyError, Result};
use crate::fmt::money;
use crate::installments::{apply_unification, offer_unification, unify_stored};
use crate::models::Category;
use crate::store::RecordStore;

pub fn run(ctx: &Context, hash: &str, category: Option<&str>) -> Result<()> {
    let mut store = ctx.open_store()?;
    let hash_id = resolve_hash(&store, hash)?;
    let txn = store
        .get(&hash_id)?
        .ok_or_else(|| LedgerlyError::UnknownTransaction(hash_id.clone()))?;
    if txn.is_manual || !txn.is_pending() {
        return Err(LedgerlyError::Validation(format!(
            "'{}' is already classified or locked",
            txn.description
        )));
    }
    let offer = offer_unification(&txn).ok_or_else(|| {
        LedgerlyError::Validation(format!(
            "'{}' is not the first installment of a series",
            txn.description
        ))
    })?;
    let category = category.map(Category::parse).transpose()?;

    apply_unification(&mut store, &offer, category)?;
    println!(
        "{} \u{2192} {} ({} x {})",
        txn.description,
        offer.description,
        offer.tag.total,
        money(offer.per_installment)
    );
    println!("Full value: {}", money(offer.full_value));
    Ok(())
}

pub fn stored(ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    let records = store.select_all()?;
    let outcome = unify_stored(&mut store, &records, ctx.settings.installment_tolerance)?;
    println!(
        "{} series merged, {} entries removed, {} installments without a first entry",
        outcome.unified, outcome.suppressed, outcome.unmatched
    );
    Ok(())
}
