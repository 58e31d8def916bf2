use chrono::NaiveDate;
use comfy_table::{Cell, Table};

use super::Context;
use crate::error::Result;
use crate::fmt::money;
use crate::loans::{generate_plan, save_plan};

pub fn run(ctx: &Context, name: &str, amount: f64, first_due: NaiveDate, count: u32, save: bool) -> Result<()> {
    let plan = generate_plan(name, amount, first_due, count)?;

    let mut table = Table::new();
    table.set_header(vec!["Due", "Description", "Amount"]);
    for txn in &plan {
        table.add_row(vec![
            Cell::new(txn.date),
            Cell::new(&txn.description),
            Cell::new(money(txn.amount)),
        ]);
    }
    let total: f64 = plan.iter().map(|t| t.amount).sum();
    println!("{table}");
    println!("{} installments, total {}", plan.len(), money(total));

    if save {
        let mut store = ctx.open_store()?;
        let saved = save_plan(&mut store, &plan)?;
        if saved == 0 {
            println!("These installments were already stored.");
        } else {
            println!("{saved} installments stored.");
        }
    } else {
        println!("Run again with --save to store them.");
    }
    Ok(())
}
