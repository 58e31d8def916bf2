mod categorizer;
mod cli;
mod db;
mod error;
mod fingerprint;
mod fmt;
mod importer;
mod installments;
mod loans;
mod models;
mod parsers;
mod reports;
mod reviewer;
mod settings;
mod store;
mod window;

use clap::Parser;
use tracing_subscriber::prelude::*;

use cli::{Cli, Commands, Context, RulesCommands};

fn main() {
    fn get_rust_log() -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into())
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(get_rust_log()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = Context::load(cli.db).and_then(|ctx| match cli.command {
        Commands::Import {
            files,
            no_unify,
            comma_decimal,
            format,
        } => cli::import::run(&ctx, &files, no_unify, comma_decimal, format.as_deref()),
        Commands::Categorize => cli::categorize::run(&ctx),
        Commands::Rules { command } => match command {
            RulesCommands::Add { term, category } => cli::rules::add(&ctx, &term, &category),
            RulesCommands::List => cli::rules::list(&ctx),
            RulesCommands::Delete { term } => cli::rules::delete(&ctx, &term),
        },
        Commands::Classify { hash, category } => cli::classify::run(&ctx, &hash, &category),
        Commands::Review => cli::review::run(&ctx),
        Commands::Resolve {
            description,
            category,
            manual,
        } => cli::review::resolve(&ctx, &description, &category, manual),
        Commands::Unify { hash, category } => cli::unify::run(&ctx, &hash, category.as_deref()),
        Commands::UnifyStored => cli::unify::stored(&ctx),
        Commands::Loan {
            name,
            amount,
            first_due,
            count,
            save,
        } => cli::loan::run(&ctx, &name, amount, first_due, count, save),
        Commands::Window {
            start,
            end,
            category,
            dry_run,
        } => cli::window::run(&ctx, start, end, &category, dry_run),
        Commands::Status => cli::status::run(&ctx),
        Commands::Report { from_date, to_date } => cli::report::summary(&ctx, from_date, to_date),
        Commands::Radar => cli::report::radar(&ctx),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
