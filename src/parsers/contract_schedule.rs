//! Installment contract schedules. Documents are reduced to tables (one per
//! page or worksheet) and every open installment row becomes a future
//! outflow.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::{parse_amount, parse_date, NumberLocale};
use crate::error::{LedgerlyError, Result};
use crate::models::Transaction;

/// Rows of trimmed cells.
pub type Table = Vec<Vec<String>>;

#[derive(Debug, Clone, PartialEq)]
pub struct TabularConfig {
    /// Present in the due-date cell of header rows.
    pub due_date_marker: String,
    /// Status markers for installments that were skipped by the lender.
    pub skipped_markers: Vec<String>,
    /// Status markers for installments already paid.
    pub settled_markers: Vec<String>,
    /// Keep settled rows (historical view) instead of open obligations only.
    pub include_settled: bool,
    pub currency_marker: String,
    pub locale: NumberLocale,
    pub date_format: String,
    pub description_prefix: String,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            due_date_marker: "VENCIMENTO".into(),
            skipped_markers: vec!["PULA".into()],
            settled_markers: vec!["LIQUIDADA".into()],
            include_settled: false,
            currency_marker: "R$".into(),
            locale: NumberLocale::COMMA_DECIMAL,
            date_format: "%d/%m/%Y".into(),
            description_prefix: "Contract installment".into(),
        }
    }
}

fn cell_separator() -> &'static Regex {
    static SEP: OnceLock<Regex> = OnceLock::new();
    SEP.get_or_init(|| Regex::new(r"\s{2,}").expect("static pattern"))
}

/// Splits extracted text into tables: pages on form feed, cells on runs of
/// two or more spaces.
pub fn text_tables(text: &str) -> Vec<Table> {
    text.split('\u{000C}')
        .map(|page| {
            page.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| {
                    cell_separator()
                        .split(line)
                        .map(|cell| cell.trim().to_string())
                        .collect()
                })
                .collect::<Table>()
        })
        .filter(|table| !table.is_empty())
        .collect()
}

fn find_amount(cells: &[String], config: &TabularConfig) -> Option<f64> {
    for (i, cell) in cells.iter().enumerate() {
        if !cell.contains(config.currency_marker.as_str()) {
            continue;
        }
        let rest = cell.replace(config.currency_marker.as_str(), "");
        let candidate = if rest.trim().is_empty() {
            cells.get(i + 1).map(String::as_str).unwrap_or_default()
        } else {
            rest.as_str()
        };
        if let Some(value) = parse_amount(candidate, config.locale) {
            return Some(value);
        }
    }
    None
}

fn is_excluded_status(status: &str, config: &TabularConfig) -> bool {
    let status = status.to_uppercase();
    let skipped = config.skipped_markers.iter().any(|m| status.contains(m.as_str()));
    let settled = !config.include_settled
        && config.settled_markers.iter().any(|m| status.contains(m.as_str()));
    skipped || settled
}

/// Converts schedule tables into liability candidates. Row problems never
/// fail the document; the row is dropped.
pub fn parse_tables(tables: &[Table], filename: &str, config: &TabularConfig) -> Vec<Transaction> {
    let source = format!("Contract: {filename}");
    let mut rows = Vec::new();
    for row in tables.iter().flatten() {
        if row.len() < 3 {
            continue;
        }
        if row[1].to_uppercase().contains(config.due_date_marker.as_str()) {
            continue;
        }
        if is_excluded_status(&row[2], config) {
            continue;
        }
        let Some(date) = parse_date(&row[1], &config.date_format) else {
            continue;
        };
        let Some(amount) = find_amount(row, config) else {
            tracing::debug!("{filename}: no {} amount on row {:?}", config.currency_marker, row[0]);
            continue;
        };
        if amount == 0.0 {
            continue;
        }
        let description = format!("{} {}", config.description_prefix, row[0].trim());
        rows.push(Transaction::candidate(
            date,
            description.trim(),
            -amount.abs(),
            &source,
        ));
    }
    rows
}

pub fn parse(buffer: &[u8], filename: &str, config: &TabularConfig) -> Result<Vec<Transaction>> {
    let tables = extract_tables(buffer, filename)?;
    Ok(parse_tables(&tables, filename, config))
}

#[cfg_attr(not(any(feature = "pdf", feature = "xlsx")), allow(unused_variables))]
fn extract_tables(buffer: &[u8], filename: &str) -> Result<Vec<Table>> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        #[cfg(feature = "pdf")]
        "pdf" => pdf_tables(buffer, filename),
        #[cfg(feature = "xlsx")]
        "xlsx" => spreadsheet_tables(buffer, filename),
        _ => Err(LedgerlyError::UnsupportedFormat(filename.to_string())),
    }
}

#[cfg(feature = "pdf")]
fn pdf_tables(buffer: &[u8], filename: &str) -> Result<Vec<Table>> {
    let text = pdf_extract::extract_text_from_mem(buffer).map_err(|e| LedgerlyError::Document {
        file: filename.to_string(),
        reason: e.to_string(),
    })?;
    Ok(text_tables(&text))
}

#[cfg(feature = "xlsx")]
fn spreadsheet_tables(buffer: &[u8], filename: &str) -> Result<Vec<Table>> {
    use calamine::{Data, Reader, Xlsx};

    let mut workbook: Xlsx<_> = Xlsx::new(std::io::Cursor::new(buffer.to_vec())).map_err(|e| {
        LedgerlyError::Document {
            file: filename.to_string(),
            reason: e.to_string(),
        }
    })?;

    let mut tables = Vec::new();
    for name in workbook.sheet_names() {
        let Ok(range) = workbook.worksheet_range(&name) else {
            continue;
        };
        let table: Table = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
                        other => other.to_string().trim().to_string(),
                    })
                    .collect()
            })
            .collect();
        tables.push(table);
    }
    Ok(tables)
}

/// Renders an Excel serial date in the schedule's `DD/MM/YYYY` layout.
#[cfg(any(feature = "xlsx", test))]
pub fn excel_serial_to_date(serial: f64) -> String {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%d/%m/%Y").to_string()
}
