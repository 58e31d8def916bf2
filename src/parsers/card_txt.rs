//! Fixed-layout card invoice export. Free text preamble, then a header line,
//! then one purchase per line: `DD.MM.YYYY  NARRATIVE  AMOUNT`.

use regex::Regex;

use super::{decode_with_fallback, parse_amount, parse_date, NumberLocale, TextEncoding};
use crate::error::{LedgerlyError, Result};
use crate::models::Transaction;

/// How invoice amounts map to ledger signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardSign {
    /// Every line is an outflow, credits included.
    #[default]
    AlwaysOutflow,
    /// Charges become outflows and negative lines (refunds) become inflows.
    Invert,
}

impl CardSign {
    fn apply(self, charge: f64) -> f64 {
        match self {
            Self::AlwaysOutflow => -charge.abs(),
            Self::Invert => -charge,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedLayoutConfig {
    pub primary_encoding: TextEncoding,
    pub fallback_encoding: TextEncoding,
    pub locale: NumberLocale,
    /// The header line must contain one of these...
    pub date_markers: Vec<String>,
    /// ...and one of these.
    pub transaction_markers: Vec<String>,
    /// Payment and prior-balance lines; dropped to avoid double counting.
    pub skip_markers: Vec<String>,
    /// When set, a line containing this marker ends capture. Without it,
    /// capture runs to the end of the input.
    pub terminator: Option<String>,
    pub sign: CardSign,
}

impl Default for FixedLayoutConfig {
    fn default() -> Self {
        Self {
            primary_encoding: TextEncoding::Utf8,
            fallback_encoding: TextEncoding::Latin1,
            locale: NumberLocale::COMMA_DECIMAL,
            date_markers: vec!["Data".into(), "Date".into()],
            transaction_markers: vec!["Transa\u{e7}\u{f5}es".into(), "Transactions".into()],
            skip_markers: vec!["SALDO FATURA".into(), "PGTO DEBITO".into()],
            terminator: None,
            sign: CardSign::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureState {
    Searching,
    Capturing,
    Done,
}

fn line_pattern(locale: NumberLocale) -> Result<Regex> {
    let decimal = regex::escape(&locale.decimal.to_string());
    let thousands = locale
        .thousands
        .map(|t| regex::escape(&t.to_string()))
        .unwrap_or_default();
    let pattern = format!(r"^(\d{{2}}\.\d{{2}}\.\d{{4}})(.*?)\s+(-?[\d{thousands}]+{decimal}\d{{2}})");
    Regex::new(&pattern).map_err(|e| LedgerlyError::Other(format!("invalid line pattern: {e}")))
}

fn is_header(line: &str, config: &FixedLayoutConfig) -> bool {
    config.date_markers.iter().any(|m| line.contains(m.as_str()))
        && config.transaction_markers.iter().any(|m| line.contains(m.as_str()))
}

pub fn parse(buffer: &[u8], filename: &str, config: &FixedLayoutConfig) -> Result<Vec<Transaction>> {
    let content = decode_with_fallback(
        buffer,
        config.primary_encoding,
        config.fallback_encoding,
        filename,
    )?;
    let pattern = line_pattern(config.locale)?;
    let source = format!("Card: {filename}");

    let mut state = CaptureState::Searching;
    let mut rows = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if state == CaptureState::Done {
            break;
        }
        if is_header(line, config) {
            state = CaptureState::Capturing;
            continue;
        }
        if state == CaptureState::Searching {
            continue;
        }
        if let Some(marker) = &config.terminator {
            if line.contains(marker.as_str()) {
                state = CaptureState::Done;
                continue;
            }
        }

        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        let description = caps[2].trim();
        let upper = description.to_uppercase();
        if description.is_empty() || config.skip_markers.iter().any(|m| upper.contains(&m.to_uppercase())) {
            continue;
        }
        let Some(date) = parse_date(&caps[1], "%d.%m.%Y") else {
            tracing::debug!("{filename}: skipping line with date {:?}", &caps[1]);
            continue;
        };
        let Some(charge) = parse_amount(&caps[3], config.locale) else {
            continue;
        };
        rows.push(Transaction::candidate(date, description, config.sign.apply(charge), &source));
    }

    if state == CaptureState::Searching {
        tracing::debug!("{filename}: no transaction header found");
    }
    Ok(rows)
}
