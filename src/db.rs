// SQLite backend
//
// periods: one row per saved week, ordered by an autoincrement ordinal.
//          Rates and totals are plain columns, the account list is a JSON
//          column (accounts are never queried individually).
// draft:   single row (id = 1) holding the JSON-encoded draft.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::aggregation::Totals;
use crate::currency::ExchangeRateSet;
use crate::entities::{AccountBalance, Period, PeriodDraft};
use crate::error::{LedgerError, Result};
use crate::repository::{DraftStore, PeriodRepository};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS periods (
            ordinal INTEGER PRIMARY KEY AUTOINCREMENT,
            period_id TEXT UNIQUE NOT NULL,
            date TEXT NOT NULL,
            usd_to_brl REAL NOT NULL,
            eur_to_brl REAL NOT NULL,
            btc_to_usd REAL NOT NULL,
            accounts TEXT NOT NULL,
            total_usd REAL NOT NULL,
            total_brl REAL NOT NULL,
            total_eur REAL NOT NULL,
            saved_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS draft (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            data TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_periods_date ON periods(date)",
        [],
    )?;

    Ok(())
}

/// Raw column values of a `periods` row, converted after the query finishes
struct PeriodRow {
    period_id: String,
    date: String,
    rates: ExchangeRateSet,
    accounts: String,
    totals: Totals,
    saved_at: String,
}

impl PeriodRow {
    fn into_period(self) -> Result<Period> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
            .map_err(|e| LedgerError::Corrupt(format!("period {} date '{}': {}", self.period_id, self.date, e)))?;
        let saved_at = DateTime::parse_from_rfc3339(&self.saved_at)
            .map_err(|e| LedgerError::Corrupt(format!("period {} saved_at '{}': {}", self.period_id, self.saved_at, e)))?
            .with_timezone(&Utc);
        let accounts: Vec<AccountBalance> = serde_json::from_str(&self.accounts)?;

        Ok(Period {
            id: self.period_id,
            date,
            rates: self.rates,
            accounts,
            totals: self.totals,
            saved_at,
        })
    }
}

pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        tracing::debug!(path = %path.display(), "Opened SQLite ledger");
        Ok(SqliteRepository { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteRepository { conn })
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM periods", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn insert_period(conn: &Connection, period: &Period) -> Result<()> {
    let accounts_json = serde_json::to_string(&period.accounts)?;

    conn.execute(
        "INSERT INTO periods (
            period_id, date, usd_to_brl, eur_to_brl, btc_to_usd,
            accounts, total_usd, total_brl, total_eur, saved_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            period.id,
            period.date.format(DATE_FORMAT).to_string(),
            period.rates.usd_to_brl,
            period.rates.eur_to_brl,
            period.rates.btc_to_usd,
            accounts_json,
            period.totals.usd,
            period.totals.brl,
            period.totals.eur,
            period.saved_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

impl PeriodRepository for SqliteRepository {
    fn load_all(&self) -> Result<Vec<Period>> {
        let mut stmt = self.conn.prepare(
            "SELECT period_id, date, usd_to_brl, eur_to_brl, btc_to_usd,
                    accounts, total_usd, total_brl, total_eur, saved_at
             FROM periods
             ORDER BY ordinal ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(PeriodRow {
                    period_id: row.get(0)?,
                    date: row.get(1)?,
                    rates: ExchangeRateSet {
                        usd_to_brl: row.get(2)?,
                        eur_to_brl: row.get(3)?,
                        btc_to_usd: row.get(4)?,
                    },
                    accounts: row.get(5)?,
                    totals: Totals {
                        usd: row.get(6)?,
                        brl: row.get(7)?,
                        eur: row.get(8)?,
                    },
                    saved_at: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(PeriodRow::into_period).collect()
    }

    fn save_all(&self, periods: &[Period]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM periods", [])?;
        for period in periods {
            insert_period(&tx, period)?;
        }
        tx.commit()?;
        tracing::debug!(periods = periods.len(), "Replaced SQLite history");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let removed = self.conn.execute("DELETE FROM periods", [])?;
        tracing::debug!(removed, "Cleared SQLite history");
        Ok(())
    }

    fn append(&self, period: &Period) -> Result<()> {
        insert_period(&self.conn, period)
    }
}

impl DraftStore for SqliteRepository {
    fn load_draft(&self) -> Result<Option<PeriodDraft>> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM draft WHERE id = 1", [], |row| row.get(0))
            .optional()?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_draft(&self, draft: &PeriodDraft) -> Result<()> {
        let json = serde_json::to_string(draft)?;
        self.conn.execute(
            "INSERT INTO draft (id, data, updated_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn discard_draft(&self) -> Result<()> {
        self.conn.execute("DELETE FROM draft", [])?;
        Ok(())
    }
}
