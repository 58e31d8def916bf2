use std::path::{Path, PathBuf};

use crate::error::{LedgerlyError, Result};
use crate::installments::{self, DEFAULT_TOLERANCE};
use crate::models::Transaction;
use crate::parsers::bank_csv::{self, DelimitedConfig};
use crate::parsers::card_txt::{self, FixedLayoutConfig};
use crate::parsers::contract_schedule::{self, TabularConfig};
use crate::store::RecordStore;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    pub delimited: DelimitedConfig,
    pub fixed_layout: FixedLayoutConfig,
    pub tabular: TabularConfig,
    /// Forces one parser instead of choosing by file extension.
    pub format: Option<FormatKind>,
    /// Fold installment siblings of each file before saving.
    pub unify_installments: bool,
    pub installment_tolerance: f64,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimited: DelimitedConfig::default(),
            fixed_layout: FixedLayoutConfig::default(),
            tabular: TabularConfig::default(),
            format: None,
            unify_installments: true,
            installment_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

// ---------------------------------------------------------------------------
// Format kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    DelimitedText,
    FixedLayout,
    TabularDocument,
}

impl FormatKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::DelimitedText => "delimited",
            Self::FixedLayout => "fixed_layout",
            Self::TabularDocument => "tabular",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DelimitedText => "Bank statement (CSV)",
            Self::FixedLayout => "Card invoice (text)",
            Self::TabularDocument => "Contract schedule",
        }
    }

    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::DelimitedText => &["csv"],
            Self::FixedLayout => &["txt"],
            Self::TabularDocument => &["pdf", "xlsx"],
        }
    }

    pub fn parse(&self, buffer: &[u8], filename: &str, options: &ImportOptions) -> Result<Vec<Transaction>> {
        match self {
            Self::DelimitedText => bank_csv::parse(buffer, filename, &options.delimited),
            Self::FixedLayout => card_txt::parse(buffer, filename, &options.fixed_layout),
            Self::TabularDocument => contract_schedule::parse(buffer, filename, &options.tabular),
        }
    }
}

const ALL_FORMATS: &[FormatKind] = &[
    FormatKind::DelimitedText,
    FormatKind::FixedLayout,
    FormatKind::TabularDocument,
];

pub fn get_by_key(key: &str) -> Option<FormatKind> {
    ALL_FORMATS.iter().find(|f| f.key() == key).copied()
}

pub fn format_keys() -> Vec<&'static str> {
    ALL_FORMATS.iter().map(FormatKind::key).collect()
}

/// Picks the parser from the file extension.
pub fn format_for_file(filename: &str) -> Result<FormatKind> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    ALL_FORMATS
        .iter()
        .find(|f| f.extensions().contains(&extension.as_str()))
        .copied()
        .ok_or_else(|| LedgerlyError::UnsupportedFormat(filename.to_string()))
}

// ---------------------------------------------------------------------------
// Dedup gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub read: usize,
    pub saved: usize,
}

impl SaveSummary {
    pub fn duplicates(&self) -> usize {
        self.read - self.saved
    }
}

/// Inserts every candidate whose fingerprint is not stored yet. Duplicates
/// are counted, never reported as errors.
pub fn save_batch(store: &mut impl RecordStore, candidates: &[Transaction]) -> Result<SaveSummary> {
    let mut saved = 0usize;
    for txn in candidates {
        if store.insert_if_absent(txn)? {
            saved += 1;
        }
    }
    Ok(SaveSummary {
        read: candidates.len(),
        saved,
    })
}

// ---------------------------------------------------------------------------
// import_buffer / import_files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub format: FormatKind,
    /// Rows the parser produced, before unification.
    pub parsed: usize,
    pub unified: usize,
    pub suppressed: usize,
    pub read: usize,
    pub saved: usize,
}

#[derive(Debug)]
pub enum FileOutcome {
    Imported(ImportSummary),
    Failed(LedgerlyError),
}

#[derive(Debug)]
pub struct FileReport {
    pub file: String,
    pub outcome: FileOutcome,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub files: Vec<FileReport>,
}

impl ImportReport {
    pub fn total_saved(&self) -> usize {
        self.summaries().map(|s| s.saved).sum()
    }

    pub fn failures(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed(_)))
            .count()
    }

    fn summaries(&self) -> impl Iterator<Item = &ImportSummary> {
        self.files.iter().filter_map(|f| match &f.outcome {
            FileOutcome::Imported(summary) => Some(summary),
            FileOutcome::Failed(_) => None,
        })
    }
}

/// Parses one file buffer, optionally unifies its installments and saves the
/// result through the dedup gate.
pub fn import_buffer(
    store: &mut impl RecordStore,
    buffer: &[u8],
    filename: &str,
    options: &ImportOptions,
) -> Result<ImportSummary> {
    let format = match options.format {
        Some(format) => format,
        None => format_for_file(filename)?,
    };
    let mut candidates = format.parse(buffer, filename, options)?;
    let parsed = candidates.len();

    let (mut unified, mut suppressed) = (0, 0);
    if options.unify_installments {
        let outcome = installments::unify_batch(candidates, options.installment_tolerance);
        unified = outcome.unified;
        suppressed = outcome.suppressed;
        candidates = outcome.records;
    }

    let summary = save_batch(store, &candidates)?;
    if summary.duplicates() > 0 {
        tracing::debug!("{filename}: {} rows already stored", summary.duplicates());
    }
    let SaveSummary { read, saved } = summary;
    Ok(ImportSummary {
        format,
        parsed,
        unified,
        suppressed,
        read,
        saved,
    })
}

/// Imports each file on its own. A failing file is recorded in the report
/// and the remaining files still run.
pub fn import_files(store: &mut impl RecordStore, files: &[PathBuf], options: &ImportOptions) -> ImportReport {
    let mut report = ImportReport::default();
    for path in files {
        let file = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let result = std::fs::read(path)
            .map_err(LedgerlyError::from)
            .and_then(|buffer| import_buffer(store, &buffer, &file, options));
        let outcome = match result {
            Ok(summary) => {
                tracing::info!(
                    "{file}: {} read, {} new ({})",
                    summary.read,
                    summary.saved,
                    summary.format.name()
                );
                FileOutcome::Imported(summary)
            }
            Err(e) => {
                tracing::warn!("{file}: {e}");
                FileOutcome::Failed(e)
            }
        };
        report.files.push(FileReport { file, outcome });
    }
    report
}
