//! Delimited bank-account export: one row per posting with date, narrative
//! and amount columns.

use std::sync::OnceLock;

use regex::Regex;

use super::{decode_with_fallback, parse_amount, parse_date, NumberLocale, TextEncoding};
use crate::error::{LedgerlyError, Result};
use crate::models::Transaction;

#[derive(Debug, Clone, PartialEq)]
pub struct DelimitedConfig {
    pub delimiter: u8,
    pub primary_encoding: TextEncoding,
    pub fallback_encoding: TextEncoding,
    pub locale: NumberLocale,
    pub date_column: String,
    pub narrative_column: String,
    pub amount_column: String,
    pub date_format: String,
    /// Narratives containing any of these are running-balance lines.
    pub balance_markers: Vec<String>,
}

impl Default for DelimitedConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            primary_encoding: TextEncoding::Utf8,
            fallback_encoding: TextEncoding::Latin1,
            locale: NumberLocale::DOT_DECIMAL,
            date_column: "Data".into(),
            narrative_column: "Hist\u{f3}rico".into(),
            amount_column: "Valor".into(),
            date_format: "%d/%m/%Y".into(),
            balance_markers: vec!["Saldo".into(), "S A L D O".into()],
        }
    }
}

impl DelimitedConfig {
    pub fn with_locale(mut self, locale: NumberLocale) -> Self {
        self.locale = locale;
        self
    }
}

fn prefix_rewrites() -> &'static [(Regex, &'static str)] {
    static REWRITES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    REWRITES.get_or_init(|| {
        [
            (r"Compra com Cartão - \d{2}/\d{2} \d{2}:\d{2} ", ""),
            (r"Pix - Enviado - \d{2}/\d{2} \d{2}:\d{2} ", "Pix env: "),
            (r"Pix - Recebido - \d{2}/\d{2} \d{2}:\d{2} ", "Pix rec: "),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
        .collect()
    })
}

/// Strips card-purchase timestamps and shortens transfer markers. Lossy: the
/// discarded timestamps must stay discarded so fingerprints stay stable
/// across re-imports.
pub fn clean_narrative(raw: &str) -> String {
    let mut desc = raw.trim().to_string();
    for (re, replacement) in prefix_rewrites() {
        desc = re.replace_all(&desc, *replacement).into_owned();
    }
    desc
}

pub fn parse(buffer: &[u8], filename: &str, config: &DelimitedConfig) -> Result<Vec<Transaction>> {
    let text = decode_with_fallback(
        buffer,
        config.primary_encoding,
        config.fallback_encoding,
        filename,
    )?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(config.delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let (idx_date, idx_desc, idx_amount) = match (
        position(config.date_column.as_str()),
        position(config.narrative_column.as_str()),
        position(config.amount_column.as_str()),
    ) {
        (Some(d), Some(n), Some(a)) => (d, n, a),
        (d, n, a) => {
            let missing = [
                (d, &config.date_column),
                (n, &config.narrative_column),
                (a, &config.amount_column),
            ]
            .into_iter()
            .filter(|(idx, _)| idx.is_none())
            .map(|(_, name)| name.clone())
            .collect();
            return Err(LedgerlyError::MissingColumns {
                file: filename.to_string(),
                missing,
            });
        }
    };

    let source = format!("CSV: {filename}");
    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let Ok(record) = result else {
            tracing::debug!("{filename}: skipping unreadable record {line}");
            continue;
        };
        let (Some(raw_date), Some(narrative), Some(raw_amount)) =
            (record.get(idx_date), record.get(idx_desc), record.get(idx_amount))
        else {
            continue;
        };
        if config.balance_markers.iter().any(|m| narrative.contains(m.as_str())) {
            continue;
        }
        let Some(date) = parse_date(raw_date, &config.date_format) else {
            tracing::debug!("{filename}: skipping record {line} with date {raw_date:?}");
            continue;
        };
        let Some(amount) = parse_amount(raw_amount, config.locale) else {
            tracing::debug!("{filename}: skipping record {line} with amount {raw_amount:?}");
            continue;
        };
        let description = clean_narrative(narrative);
        if description.is_empty() {
            continue;
        }
        rows.push(Transaction::candidate(date, &description, amount, &source));
    }
    Ok(rows)
}
