// Error types shared by the engine, entities and stores

use thiserror::Error;

use crate::currency::Currency;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid exchange rate for {currency}: {rate}")]
    InvalidRate { currency: Currency, rate: f64 },

    #[error("{field} is out of range: {value}")]
    NonFinite { field: String, value: f64 },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid account position {index} (list has {len} accounts)")]
    InvalidIndex { index: usize, len: usize },

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
