use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::currency::Currency;
use crate::error::LedgerError;

#[derive(Parser, Debug)]
#[command(name = "weekly-ledger", version = crate::VERSION, about = "Weekly multi-currency balance tracker")]
pub struct CliArgs {
    /// Path to config file
    #[arg(short, long, default_value = "weekly-ledger.toml")]
    pub config: String,

    /// Ledger location (overrides config file)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Storage backend (overrides config file)
    #[arg(short, long, value_enum)]
    pub backend: Option<Backend>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the draft week: rates, accounts and totals
    Show {
        /// Currency for the portfolio total (defaults to config)
        #[arg(long)]
        currency: Option<String>,
    },
    /// Set the draft's exchange rates
    Rates {
        usd_to_brl: String,
        eur_to_brl: String,
        btc_to_usd: Option<String>,
    },
    /// Add an account to the draft
    Add { name: String },
    /// Rename a draft account
    Rename { id: String, name: String },
    /// Remove a draft account
    Remove { id: String },
    /// Move a draft account from one position to another (0-based)
    Move { from: usize, to: usize },
    /// Set one balance of an account; the other two are recomputed
    Set {
        id: String,
        currency: String,
        amount: String,
    },
    /// Save the draft as a new period in history
    Save,
    /// Start a new week from the latest saved period
    New {
        /// Do not carry the previous week's rates forward
        #[arg(long)]
        clear_rates: bool,
        /// Date label for the new week (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Portfolio total per saved week with trend
    History {
        #[arg(long)]
        currency: Option<String>,
    },
    /// One account's balance across saved weeks
    Account {
        name: String,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Export history to CSV
    Export { file: PathBuf },
    /// Append periods from a CSV export
    Import { file: PathBuf },
    /// Delete all saved history
    Clear,
    /// Interactive dashboard
    #[cfg(feature = "tui")]
    Ui,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Json,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub tracker: TrackerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,

    #[serde(default = "default_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackerSettings {
    /// Currency used for totals, history and trends
    #[serde(default = "default_comparison_currency")]
    pub comparison_currency: Currency,

    /// Copy last week's rates into a new week
    #[serde(default = "default_carry_forward")]
    pub carry_forward_rates: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            comparison_currency: default_comparison_currency(),
            carry_forward_rates: default_carry_forward(),
        }
    }
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        backend: default_backend(),
        path: default_path(),
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        json: false,
    }
}

fn default_backend() -> Backend {
    Backend::Json
}

fn default_path() -> PathBuf {
    PathBuf::from("weekly-ledger.json")
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_comparison_currency() -> Currency {
    Currency::BRL
}

fn default_carry_forward() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: default_storage(),
            logging: default_logging(),
            tracker: TrackerSettings::default(),
        }
    }
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Read a config file. A missing file yields `None`; any other read
    /// failure or a parse failure is an error.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Option<Self>> {
        let contents = match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Config::from_toml(&contents)
            .map(Some)
            .map_err(|e| LedgerError::Config(e.to_string()))
    }

    pub fn load(cli: &CliArgs) -> Self {
        let mut config = match Config::from_file(&cli.config) {
            Ok(Some(config)) => config,
            Ok(None) => Config::default(),
            Err(e) => {
                eprintln!("Warning: Failed to load config file {}: {}", cli.config, e);
                Config::default()
            }
        };

        // CLI overrides
        if let Some(ref path) = cli.data {
            config.storage.path = path.clone();
        }
        if let Some(backend) = cli.backend {
            config.storage.backend = backend;
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.storage.backend, Backend::Json);
        assert_eq!(config.storage.path, PathBuf::from("weekly-ledger.json"));
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.json);
        assert_eq!(config.tracker.comparison_currency, Currency::BRL);
        assert!(config.tracker.carry_forward_rates);
    }

    #[test]
    fn test_full_document() {
        let config = Config::from_toml(
            r#"
            [storage]
            backend = "sqlite"
            path = "/tmp/ledger.db"

            [logging]
            level = "debug"
            json = true

            [tracker]
            comparison_currency = "USD"
            carry_forward_rates = false
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, Backend::Sqlite);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.tracker.comparison_currency, Currency::USD);
        assert!(!config.tracker.carry_forward_rates);
    }

    #[test]
    fn test_currency_is_case_insensitive() {
        let config = Config::from_toml("[tracker]\ncomparison_currency = \"usd\"").unwrap();
        assert_eq!(config.tracker.comparison_currency, Currency::USD);

        assert!(Config::from_toml("[tracker]\ncomparison_currency = \"gbp\"").is_err());
    }

    #[test]
    fn test_from_file_distinguishes_missing_and_unreadable() {
        let dir = tempfile::tempdir().unwrap();

        let missing = Config::from_file(dir.path().join("absent.toml")).unwrap();
        assert!(missing.is_none());

        // A directory exists but cannot be read as a file
        assert!(matches!(Config::from_file(dir.path()), Err(LedgerError::Io(_))));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[storage\n").unwrap();
        assert!(matches!(Config::from_file(&broken), Err(LedgerError::Config(_))));

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[storage]\nbackend = \"sqlite\"").unwrap();
        let config = Config::from_file(&good).unwrap().unwrap();
        assert_eq!(config.storage.backend, Backend::Sqlite);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Config::from_toml("[storage]\nbackend = \"redis\"").is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = CliArgs::parse_from([
            "weekly-ledger",
            "--config",
            "/nonexistent/weekly-ledger.toml",
            "--data",
            "other.db",
            "--backend",
            "sqlite",
            "--log-level",
            "trace",
            "save",
        ]);

        let config = Config::load(&cli);

        assert_eq!(config.storage.path, PathBuf::from("other.db"));
        assert_eq!(config.storage.backend, Backend::Sqlite);
        assert_eq!(config.logging.level, "trace");
    }
}
