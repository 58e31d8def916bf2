use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerlyError, Result};
use crate::importer::ImportOptions;
use crate::installments::DEFAULT_TOLERANCE;
use crate::parsers::card_txt::CardSign;
use crate::parsers::NumberLocale;

/// Decimal convention of delimited bank exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvLocale {
    Dot,
    Comma,
}

impl CsvLocale {
    pub fn number_locale(self) -> NumberLocale {
        match self {
            Self::Dot => NumberLocale::DOT_DECIMAL,
            Self::Comma => NumberLocale::COMMA_DECIMAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: String,
    pub csv_locale: CsvLocale,
    pub unify_installments: bool,
    pub installment_tolerance: f64,
    /// Marker line that ends a card invoice's transaction block.
    pub card_terminator: Option<String>,
    /// Store negative card lines (refunds) as inflows instead of outflows.
    pub card_refunds_as_inflows: bool,
    /// Keep already-settled installments when reading contract schedules.
    pub include_settled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            csv_locale: CsvLocale::Dot,
            unify_installments: true,
            installment_tolerance: DEFAULT_TOLERANCE,
            card_terminator: None,
            card_refunds_as_inflows: false,
            include_settled: false,
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand_path(&self.data_dir)).join("ledgerly.db")
    }

    pub fn import_options(&self) -> ImportOptions {
        let mut options = ImportOptions {
            unify_installments: self.unify_installments,
            installment_tolerance: self.installment_tolerance,
            ..ImportOptions::default()
        };
        options.delimited = options.delimited.with_locale(self.csv_locale.number_locale());
        options.fixed_layout.terminator = self.card_terminator.clone();
        if self.card_refunds_as_inflows {
            options.fixed_layout.sign = CardSign::Invert;
        }
        options.tabular.include_settled = self.include_settled;
        options
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ledgerly")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("ledgerly")
}

/// Missing file means defaults; a file that exists must parse.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)
        .map_err(|e| LedgerlyError::Settings(format!("{}: {e}", path.display())))?;
    if settings.installment_tolerance.is_nan() || settings.installment_tolerance < 0.0 {
        return Err(LedgerlyError::Settings(
            "installment_tolerance must be zero or positive".into(),
        ));
    }
    Ok(settings)
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(path, format!("{json}\n"))?;
        Ok(())
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/ledger".to_string(),
            csv_locale: CsvLocale::Comma,
            card_terminator: Some("Subtotal".to_string()),
            ..Settings::default()
        };
        save_settings_to(&path, &settings).unwrap();
        assert_eq!(load_settings_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("absent.json")).unwrap();
        assert!(s.unify_installments);
        assert_eq!(s.csv_locale, CsvLocale::Dot);
        assert!(!s.data_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "csv_locale": "comma"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.csv_locale, CsvLocale::Comma);
        assert_eq!(s.installment_tolerance, DEFAULT_TOLERANCE);
        assert!(s.card_terminator.is_none());
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_settings_from(&path), Err(LedgerlyError::Settings(_))));
        std::fs::write(&path, r#"{"installment_tolerance": -1.0}"#).unwrap();
        assert!(matches!(load_settings_from(&path), Err(LedgerlyError::Settings(_))));
    }

    #[test]
    fn test_import_options_follow_settings() {
        let settings = Settings {
            csv_locale: CsvLocale::Comma,
            unify_installments: false,
            card_terminator: Some("-----".to_string()),
            include_settled: true,
            ..Settings::default()
        };
        let options = settings.import_options();
        assert_eq!(options.delimited.locale, NumberLocale::COMMA_DECIMAL);
        assert!(!options.unify_installments);
        assert_eq!(options.fixed_layout.terminator.as_deref(), Some("-----"));
        assert!(options.tabular.include_settled);
        assert_eq!(options.fixed_layout.sign, CardSign::AlwaysOutflow);

        let inverted = Settings {
            card_refunds_as_inflows: true,
            ..Settings::default()
        };
        assert_eq!(inverted.import_options().fixed_layout.sign, CardSign::Invert);
    }

    #[test]
    fn test_db_path_joins_data_dir() {
        let settings = Settings {
            data_dir: "/srv/books".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.db_path(), PathBuf::from("/srv/books/ledgerly.db"));
    }
}
