use super::Context;
use crate::error::Result;
use crate::reports::ledger_status;
use crate::settings::settings_path;

pub fn run(ctx: &Context) -> Result<()> {
    println!("Settings:   {}", settings_path().display());
    println!("Database:   {}", ctx.db_path.display());

    if !ctx.db_path.exists() {
        println!();
        println!("Database not found. Import a statement to create it.");
        return Ok(());
    }

    let store = ctx.open_store()?;
    let status = ledger_status(&store)?;
    let span = match (status.first_date, status.last_date) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "(empty)".to_string(),
    };

    println!();
    println!("Transactions:  {}", status.total);
    println!("Pending:       {}", status.pending);
    println!("Rules:         {}", status.rules);
    println!("Period:        {span}");
    Ok(())
}
