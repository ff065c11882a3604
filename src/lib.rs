// Weekly Ledger - Core Library
// Exposes the conversion engine, entities and stores to the CLI and tests

pub mod currency;       // Currencies, rate sets, BRL-pivot conversion
pub mod aggregation;    // Totals, portfolio value, trends
pub mod entities;       // AccountBalance, Period, PeriodDraft
pub mod error;
pub mod repository;     // Storage traits + in-memory backend
pub mod json_store;     // JSON file backend
pub mod db;             // SQLite backend
pub mod notify;         // Change subscriptions
pub mod tracker;        // Application facade
pub mod input;          // Typed-number normalization
pub mod export;         // CSV interchange
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use currency::{convert, try_convert, Currency, ExchangeRateSet};
pub use aggregation::{
    aggregate_totals, account_series, comparison_series, currency_allocation,
    percent_change, total_in_currency,
    AccountPoint, Allocation, ComparisonPoint, Direction, Totals, Trend,
};
pub use entities::{recompute_linked_balances, AccountBalance, Period, PeriodDraft};
pub use error::{LedgerError, Result};
pub use repository::{DraftStore, InMemoryRepository, LedgerStore, PeriodRepository};
pub use json_store::JsonFileRepository;
pub use db::SqliteRepository;
pub use notify::{ChangeEvent, ChangeNotifier, SubscriptionId};
pub use tracker::{Summary, Tracker};
pub use input::{parse_amount, parse_rate};
pub use config::{Backend, Config, TrackerSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open the store selected by `config`
pub fn open_store(config: &config::StorageConfig) -> Result<Box<dyn LedgerStore>> {
    if config.path.as_os_str().is_empty() {
        return Err(LedgerError::Config("storage path is empty".to_string()));
    }
    match config.backend {
        Backend::Json => Ok(Box::new(JsonFileRepository::new(&config.path))),
        Backend::Sqlite => Ok(Box::new(SqliteRepository::open(&config.path)?)),
    }
}
