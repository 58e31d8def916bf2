use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerlyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{file}: could not decode text with any configured encoding")]
    Encoding { file: String },

    #[error("{file}: missing required columns: {}", missing.join(", "))]
    MissingColumns { file: String, missing: Vec<String> },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("{file}: unreadable document: {reason}")]
    Document { file: String, reason: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LedgerlyError>;
