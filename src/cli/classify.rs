use super::{resolve_hash, Context};
use crate::categorizer::manual_update;
use crate::error::Result;
use crate::fmt::short_hash;

pub fn run(ctx: &Context, hash: &str, category: &str) -> Result<()> {
    let mut store = ctx.open_store()?;
    let hash_id = resolve_hash(&store, hash)?;
    manual_update(&mut store, &hash_id, category)?;
    println!("{} \u{2192} {} (locked)", short_hash(&hash_id), category.trim());
    Ok(())
}
