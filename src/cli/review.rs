use comfy_table::{Cell, Table};

use super::Context;
use crate::categorizer::known_categories;
use crate::error::Result;
use crate::fmt::{money, short_hash};
use crate::installments::offer_unification;
use crate::reviewer::{pending_groups, resolve_group, ResolveMode};

pub fn run(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let groups = pending_groups(&store)?;
    if groups.is_empty() {
        println!("Nothing to review.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Count", "Description", "Total", "Latest", "Hash"]);
    for group in &groups {
        let latest = group.records.iter().max_by_key(|t| t.date);
        let mut description = group.description.clone();
        if group.records.iter().any(|t| offer_unification(t).is_some()) {
            description.push_str(" [installment]");
        }
        table.add_row(vec![
            Cell::new(group.records.len()),
            Cell::new(description),
            Cell::new(money(group.total())),
            Cell::new(latest.map(|t| t.date.to_string()).unwrap_or_default()),
            Cell::new(latest.map(|t| short_hash(&t.hash_id)).unwrap_or_default()),
        ]);
    }
    let pending: usize = groups.iter().map(|g| g.records.len()).sum();
    println!("Pending review ({pending} transactions)\n{table}");

    let categories = known_categories(&store)?;
    if !categories.is_empty() {
        println!("Known categories: {}", categories.join(", "));
    }
    println!("Resolve with `ledgerly resolve <description> --category <name> [--manual]`.");
    Ok(())
}

pub fn resolve(ctx: &Context, description: &str, category: &str, manual: bool) -> Result<()> {
    let mut store = ctx.open_store()?;
    let mode = if manual {
        ResolveMode::ManualOnly
    } else {
        ResolveMode::LearnRule
    };
    let changed = resolve_group(&mut store, description, category, mode)?;
    match mode {
        ResolveMode::LearnRule => println!(
            "Learned rule '{}' \u{2192} {}; {changed} transactions classified",
            description.trim(),
            category.trim()
        ),
        ResolveMode::ManualOnly => println!("{changed} transactions classified by hand"),
    }
    Ok(())
}
