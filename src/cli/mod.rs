pub mod categorize;
pub mod classify;
pub mod import;
pub mod loan;
pub mod report;
pub mod review;
pub mod rules;
pub mod status;
pub mod unify;
pub mod window;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::db::SqliteStore;
use crate::error::{LedgerlyError, Result};
use crate::settings::{load_settings, Settings};
use crate::store::RecordStore;

#[derive(Parser)]
#[command(name = "ledgerly", about = "Statement ingestion and spending classification.")]
pub struct Cli {
    /// Database file (default: <data_dir>/ledgerly.db from settings)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import statement files (.csv, .txt, .pdf, .xlsx) and classify them.
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Keep installment entries as they appear in the file
        #[arg(long)]
        no_unify: bool,
        /// Bank CSV amounts use a decimal comma (1.234,56)
        #[arg(long)]
        comma_decimal: bool,
        /// Parser to use for every file: delimited, fixed_layout or tabular
        #[arg(long, value_name = "KEY")]
        format: Option<String>,
    },
    /// Re-run classification rules on pending transactions.
    Categorize,
    /// Manage classification rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Classify one transaction by hand (locks it against rules).
    Classify {
        /// Transaction hash (a unique prefix is enough)
        hash: String,
        category: String,
    },
    /// List pending transactions grouped by description.
    Review,
    /// Classify every pending transaction with this description.
    Resolve {
        description: String,
        #[arg(long)]
        category: String,
        /// Classify without saving a rule
        #[arg(long)]
        manual: bool,
    },
    /// Merge a first installment into one full-value transaction.
    Unify {
        /// Transaction hash (a unique prefix is enough)
        hash: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// Merge installment series already in the database.
    UnifyStored,
    /// Project a loan's monthly installments.
    Loan {
        name: String,
        /// Amount per installment
        amount: f64,
        /// First due date: YYYY-MM-DD
        first_due: NaiveDate,
        /// Number of installments
        count: u32,
        /// Store the projected installments
        #[arg(long)]
        save: bool,
    },
    /// Move spending that only happened within a date window to one category.
    Window {
        start: NaiveDate,
        end: NaiveDate,
        category: String,
        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Show database location and ledger counts.
    Status,
    /// Income, expenses and monthly cost per category for a period.
    Report {
        #[arg(long = "from")]
        from_date: NaiveDate,
        #[arg(long = "to")]
        to_date: NaiveDate,
    },
    /// Future committed outflows per month.
    Radar,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add or replace a rule and apply it right away.
    Add {
        /// Text to look for in descriptions (case-insensitive)
        term: String,
        category: String,
    },
    /// List all rules.
    List,
    /// Delete a rule. Categories it already assigned are kept.
    Delete { term: String },
}

/// Settings and database location for one command.
pub struct Context {
    pub settings: Settings,
    pub db_path: PathBuf,
}

impl Context {
    pub fn load(db: Option<PathBuf>) -> Result<Self> {
        let settings = load_settings()?;
        let db_path = db.unwrap_or_else(|| settings.db_path());
        Ok(Self { settings, db_path })
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.db_path)
    }
}

/// Expands a hash prefix to the single stored transaction it names.
pub(crate) fn resolve_hash(store: &impl RecordStore, prefix: &str) -> Result<String> {
    let prefix = prefix.trim().to_ascii_lowercase();
    if prefix.is_empty() {
        return Err(LedgerlyError::Validation("transaction hash must not be empty".into()));
    }
    let matches: Vec<String> = store
        .select_all()?
        .into_iter()
        .map(|t| t.hash_id)
        .filter(|h| h.starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [single] => Ok(single.clone()),
        [] => Err(LedgerlyError::UnknownTransaction(prefix)),
        _ => Err(LedgerlyError::Validation(format!(
            "hash prefix {prefix} matches {} transactions",
            matches.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transaction;
    use crate::store::MemoryStore;

    #[test]
    fn test_resolve_hash_prefix() {
        let mut store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let txn = Transaction::candidate(date, "MERCADO", -10.0, "CSV: a.csv");
        store.insert_if_absent(&txn).unwrap();
        assert_eq!(resolve_hash(&store, &txn.hash_id[..8]).unwrap(), txn.hash_id);
        assert_eq!(
            resolve_hash(&store, &txn.hash_id.to_uppercase()).unwrap(),
            txn.hash_id
        );
        assert!(matches!(
            resolve_hash(&store, "zzzz"),
            Err(LedgerlyError::UnknownTransaction(_))
        ));
        assert!(matches!(resolve_hash(&store, " "), Err(LedgerlyError::Validation(_))));
    }

    #[test]
    fn test_cli_parses_global_db_and_dates() {
        let cli = Cli::try_parse_from([
            "ledgerly", "window", "2024-07-01", "2024-07-31", "Travel", "--dry-run", "--db", "/tmp/x.db",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        match cli.command {
            Commands::Window { start, dry_run, .. } => {
                assert_eq!(start, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
                assert!(dry_run);
            }
            _ => panic!("expected window command"),
        }
        assert!(Cli::try_parse_from(["ledgerly", "loan", "Car", "500", "15/01/2024", "3"]).is_err());
    }
}
