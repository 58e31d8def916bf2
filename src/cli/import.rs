use std::path::PathBuf;

use colored::Colorize;

use super::Context;
use crate::categorizer::{pending_count, run_auto_classification};
use crate::error::{LedgerlyError, Result};
use crate::importer::{format_keys, get_by_key, import_files, FileOutcome};
use crate::parsers::NumberLocale;

pub fn run(
    ctx: &Context,
    files: &[PathBuf],
    no_unify: bool,
    comma_decimal: bool,
    format: Option<&str>,
) -> Result<()> {
    let mut options = ctx.settings.import_options();
    if let Some(key) = format {
        let kind = get_by_key(key).ok_or_else(|| {
            LedgerlyError::Validation(format!(
                "unknown format '{key}' (expected one of: {})",
                format_keys().join(", ")
            ))
        })?;
        options.format = Some(kind);
    }
    let mut store = ctx.open_store()?;
    if no_unify {
        options.unify_installments = false;
    }
    if comma_decimal {
        options.delimited = options.delimited.with_locale(NumberLocale::COMMA_DECIMAL);
    }

    let report = import_files(&mut store, files, &options);
    for file in &report.files {
        match &file.outcome {
            FileOutcome::Imported(summary) => {
                let mut line = format!("{}: {} read, {} new", file.file, summary.read, summary.saved);
                if summary.unified > 0 {
                    line.push_str(&format!(
                        " ({} installment series merged, {} entries folded)",
                        summary.unified, summary.suppressed
                    ));
                }
                println!("{line}");
            }
            FileOutcome::Failed(e) => println!("{}: {}", file.file, e.to_string().red()),
        }
    }

    let classified = run_auto_classification(&mut store)?;
    println!(
        "{} new transactions, {} classified, {} pending",
        report.total_saved(),
        classified,
        pending_count(&store)?
    );

    match report.failures() {
        0 => Ok(()),
        n => Err(LedgerlyError::Other(format!("{n} of {} files failed to import", report.files.len()))),
    }
}
