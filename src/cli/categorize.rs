use super::Context;
use crate::categorizer::{pending_count, run_auto_classification};
use crate::error::Result;

pub fn run(ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    let classified = run_auto_classification(&mut store)?;
    println!("{classified} classified, {} still pending", pending_count(&store)?);
    Ok(())
}
