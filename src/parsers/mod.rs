pub mod bank_csv;
pub mod card_txt;
pub mod contract_schedule;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerlyError, Result};

// ---------------------------------------------------------------------------
// Text decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

impl TextEncoding {
    /// Strict decode. UTF-8 rejects invalid sequences; Latin-1 maps every byte.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_string)
            }
            Self::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

pub fn decode_with_fallback(
    bytes: &[u8],
    primary: TextEncoding,
    fallback: TextEncoding,
    filename: &str,
) -> Result<String> {
    if let Some(text) = primary.decode(bytes) {
        return Ok(text);
    }
    tracing::debug!("{filename}: {primary:?} decode failed, retrying as {fallback:?}");
    fallback.decode(bytes).ok_or_else(|| LedgerlyError::Encoding {
        file: filename.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Numbers and dates
// ---------------------------------------------------------------------------

/// Decimal and thousands separators of a source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberLocale {
    pub decimal: char,
    pub thousands: Option<char>,
}

impl NumberLocale {
    /// `1,234.56`
    pub const DOT_DECIMAL: NumberLocale = NumberLocale {
        decimal: '.',
        thousands: Some(','),
    };
    /// `1.234,56`
    pub const COMMA_DECIMAL: NumberLocale = NumberLocale {
        decimal: ',',
        thousands: Some('.'),
    };
}

const CURRENCY_MARKERS: &[&str] = &["R$", "$"];

/// Parses a locale-formatted amount. Accepts currency markers, quotes,
/// leading or trailing minus and parenthesized negatives. Returns `None` for
/// anything that is not a number.
pub fn parse_amount(raw: &str, locale: NumberLocale) -> Option<f64> {
    let mut s = raw.replace('"', "");
    for marker in CURRENCY_MARKERS {
        s = s.replace(marker, "");
    }
    s.retain(|c| !c.is_whitespace());

    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        s = inner.to_string();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.to_string();
    } else if let Some(rest) = s.strip_suffix('-') {
        negative = !negative;
        s = rest.to_string();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.to_string();
    }

    if let Some(sep) = locale.thousands {
        s = s.replace(sep, "");
    }
    if locale.decimal != '.' {
        s = s.replace(locale.decimal, ".");
    }
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value: f64 = s.parse().ok()?;
    Some(if negative { -value } else { value })
}

pub fn parse_date(raw: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_dot_decimal() {
        let l = NumberLocale::DOT_DECIMAL;
        assert_eq!(parse_amount("1,234.56", l), Some(1234.56));
        assert_eq!(parse_amount("\"500.00\"", l), Some(500.0));
        assert_eq!(parse_amount("  -42.50  ", l), Some(-42.5));
        assert_eq!(parse_amount("-$50.00", l), Some(-50.0));
        assert_eq!(parse_amount("(1,234.56)", l), Some(-1234.56));
        assert_eq!(parse_amount("not_a_number", l), None);
        assert_eq!(parse_amount("", l), None);
    }

    #[test]
    fn test_parse_amount_comma_decimal() {
        let l = NumberLocale::COMMA_DECIMAL;
        assert_eq!(parse_amount("1.234,56", l), Some(1234.56));
        assert_eq!(parse_amount("R$ 1.234,56", l), Some(1234.56));
        assert_eq!(parse_amount("52,00-", l), Some(-52.0));
        assert_eq!(parse_amount("-0,99", l), Some(-0.99));
        assert_eq!(parse_amount("abc", l), None);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(
            parse_date("15/01/2024", "%d/%m/%Y"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("12.09.2024", "%d.%m.%Y"),
            NaiveDate::from_ymd_opt(2024, 9, 12)
        );
        assert_eq!(parse_date("30/02/2024", "%d/%m/%Y"), None);
        assert_eq!(parse_date("Data", "%d/%m/%Y"), None);
    }

    #[test]
    fn test_utf8_rejects_latin1_bytes() {
        let latin1 = b"Hist\xF3rico";
        assert_eq!(TextEncoding::Utf8.decode(latin1), None);
        assert_eq!(TextEncoding::Latin1.decode(latin1).unwrap(), "Hist\u{f3}rico");
    }

    #[test]
    fn test_decode_with_fallback() {
        let text = decode_with_fallback(b"Hist\xF3rico", TextEncoding::Utf8, TextEncoding::Latin1, "a.csv")
            .unwrap();
        assert_eq!(text, "Hist\u{f3}rico");
        let err = decode_with_fallback(b"\xFF", TextEncoding::Utf8, TextEncoding::Utf8, "a.csv");
        assert!(matches!(err, Err(LedgerlyError::Encoding { .. })));
    }

    #[test]
    fn test_utf8_strips_bom() {
        assert_eq!(TextEncoding::Utf8.decode(b"\xEF\xBB\xBFData").unwrap(), "Data");
    }
}
