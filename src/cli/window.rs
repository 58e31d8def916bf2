use chrono::NaiveDate;
use comfy_table::{Cell, Table};

use super::Context;
use crate::error::Result;
use crate::fmt::money;
use crate::models::Category;
use crate::window::{plan_window, reclassify_window};

pub fn run(ctx: &Context, start: NaiveDate, end: NaiveDate, category: &str, dry_run: bool) -> Result<()> {
    let mut store = ctx.open_store()?;

    if dry_run {
        Category::parse(category)?;
        let plan = plan_window(&store, start, end)?;
        let mut table = Table::new();
        table.set_header(vec!["Date", "Description", "Amount"]);
        for txn in &plan.eligible {
            table.add_row(vec![
                Cell::new(txn.date),
                Cell::new(&txn.description),
                Cell::new(money(txn.amount)),
            ]);
        }
        println!("Would move to {}\n{table}", category.trim());
        if !plan.protected.is_empty() {
            println!("Protected (also seen outside the window): {}", plan.protected.join(", "));
        }
        return Ok(());
    }

    let outcome = reclassify_window(&mut store, start, end, category)?;
    println!(
        "{} transactions moved to {}, {} descriptions protected",
        outcome.changed,
        category.trim(),
        outcome.protected
    );
    Ok(())
}
