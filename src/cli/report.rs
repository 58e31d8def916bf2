use chrono::{Local, NaiveDate};
use colored::Colorize;
use comfy_table::{Cell, Table};

use super::Context;
use crate::error::Result;
use crate::fmt::{money, signed_money};
use crate::reports;

pub fn summary(ctx: &Context, from: NaiveDate, to: NaiveDate) -> Result<()> {
    let store = ctx.open_store()?;
    let data = reports::period_summary(&store, from, to)?;

    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new("Income".green().bold()), Cell::new(money(data.income))]);
    table.add_row(vec![
        Cell::new("Expenses".red().bold()),
        Cell::new(money(data.expenses.abs())),
    ]);
    table.add_row(vec![Cell::new("Balance".bold()), Cell::new(signed_money(data.balance))]);
    table.add_row(vec![
        Cell::new("Savings rate"),
        Cell::new(format!("{:.1}%", data.savings_rate)),
    ]);
    let vs_target = data.balance - data.savings_target;
    table.add_row(vec![
        Cell::new("Savings target (10%)"),
        Cell::new(format!("{} ({} vs target)", money(data.savings_target), signed_money(vs_target))),
    ]);
    println!("Cash flow {from} to {to}\n{table}");

    if data.categories.is_empty() {
        return Ok(());
    }
    let mut costs = Table::new();
    costs.set_header(vec!["Category", "Period total", "Per month"]);
    for item in &data.categories {
        let name = item
            .category
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "(pending)".to_string());
        costs.add_row(vec![
            Cell::new(name),
            Cell::new(money(item.total)),
            Cell::new(money(item.monthly)),
        ]);
    }
    println!("\nMonthly cost of living ({:.1} months)\n{costs}", data.months);
    Ok(())
}

pub fn radar(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let today = Local::now().date_naive();
    let months = reports::liability_radar(&store, today)?;
    if months.is_empty() {
        println!("No future commitments recorded.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Month", "Committed"]);
    for item in &months {
        table.add_row(vec![Cell::new(&item.month), Cell::new(money(item.total))]);
    }
    let total: f64 = months.iter().map(|m| m.total).sum();
    table.add_row(vec![Cell::new("Total".bold()), Cell::new(money(total).yellow())]);
    println!("Liability radar\n{table}");
    Ok(())
}
