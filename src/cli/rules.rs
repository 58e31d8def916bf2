use comfy_table::{Cell, Table};

use super::Context;
use crate::categorizer;
use crate::error::{LedgerlyError, Result};
use crate::store::RecordStore;

pub fn add(ctx: &Context, term: &str, category: &str) -> Result<()> {
    let mut store = ctx.open_store()?;
    let classified = categorizer::create_rule(&mut store, term, category)?;
    println!("Added rule: '{}' \u{2192} {}", term.trim(), category.trim());
    println!("{classified} transactions classified");
    Ok(())
}

pub fn list(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let rules = store.list_rules()?;
    if rules.is_empty() {
        println!("No rules yet. Add one with `ledgerly rules add <term> <category>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Term", "Category"]);
    for rule in rules {
        table.add_row(vec![Cell::new(rule.match_term), Cell::new(rule.target_category)]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn delete(ctx: &Context, term: &str) -> Result<()> {
    let mut store = ctx.open_store()?;
    if !categorizer::delete_rule(&mut store, term)? {
        return Err(LedgerlyError::Other(format!("No rule with term '{}'", term.trim())));
    }
    println!("Deleted rule '{}'", term.trim());
    Ok(())
}
