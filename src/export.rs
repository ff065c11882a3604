// CSV interchange for saved history
//
// One row per (period, account). A period without accounts is written as a
// single row with empty account columns so it survives a round trip.
// Import groups consecutive rows by period_id, recomputes totals and gives
// every imported period a fresh id so it can be appended next to existing
// history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

use crate::aggregation::aggregate_totals;
use crate::currency::ExchangeRateSet;
use crate::entities::{AccountBalance, Period};
use crate::error::{LedgerError, Result};

#[derive(Debug, Serialize, Deserialize)]
struct ExportRow {
    period_id: String,
    date: NaiveDate,
    saved_at: DateTime<Utc>,
    usd_to_brl: f64,
    eur_to_brl: f64,
    btc_to_usd: f64,
    account_id: Option<String>,
    account: Option<String>,
    usd: Option<f64>,
    brl: Option<f64>,
    eur: Option<f64>,
}

impl ExportRow {
    fn header(period: &Period) -> Self {
        ExportRow {
            period_id: period.id.clone(),
            date: period.date,
            saved_at: period.saved_at,
            usd_to_brl: period.rates.usd_to_brl,
            eur_to_brl: period.rates.eur_to_brl,
            btc_to_usd: period.rates.btc_to_usd,
            account_id: None,
            account: None,
            usd: None,
            brl: None,
            eur: None,
        }
    }

    fn with_account(period: &Period, account: &AccountBalance) -> Self {
        ExportRow {
            account_id: Some(account.id.clone()),
            account: Some(account.name.clone()),
            usd: Some(account.usd),
            brl: Some(account.brl),
            eur: Some(account.eur),
            ..ExportRow::header(period)
        }
    }

    fn rates(&self) -> ExchangeRateSet {
        ExchangeRateSet::new(self.usd_to_brl, self.eur_to_brl, self.btc_to_usd)
    }

    /// Header rows of account-less periods leave every account column empty.
    /// The name alone does not decide: it may legitimately be empty.
    fn has_account(&self) -> bool {
        self.account_id.is_some()
            || self.account.is_some()
            || self.usd.is_some()
            || self.brl.is_some()
            || self.eur.is_some()
    }
}

/// Write `periods` as CSV. Returns the number of data rows.
pub fn write_periods<W: Write>(writer: W, periods: &[Period]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows = 0;

    for period in periods {
        if period.accounts.is_empty() {
            wtr.serialize(ExportRow::header(period))?;
            rows += 1;
            continue;
        }
        for account in &period.accounts {
            wtr.serialize(ExportRow::with_account(period, account))?;
            rows += 1;
        }
    }

    wtr.flush()?;
    Ok(rows)
}

/// Read periods back from CSV written by [`write_periods`]
pub fn read_periods<R: Read>(reader: R) -> Result<Vec<Period>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut periods: Vec<Period> = Vec::new();
    let mut current_source_id: Option<String> = None;

    for (line, result) in rdr.deserialize::<ExportRow>().enumerate() {
        let row = result?;

        if current_source_id.as_deref() != Some(row.period_id.as_str()) {
            if let Some(period) = periods.last_mut() {
                period.totals = aggregate_totals(&period.accounts);
            }
            periods.push(Period {
                id: uuid::Uuid::new_v4().to_string(),
                date: row.date,
                rates: row.rates(),
                accounts: Vec::new(),
                totals: Default::default(),
                saved_at: row.saved_at,
            });
            current_source_id = Some(row.period_id.clone());
        }

        if !row.has_account() {
            continue;
        }
        let name = row.account.unwrap_or_default();
        if row.usd.is_none() || row.brl.is_none() || row.eur.is_none() {
            tracing::warn!(line = line + 2, account = %name, "Missing balance in import row, using 0");
        }

        let account = AccountBalance {
            id: row.account_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name,
            usd: row.usd.unwrap_or(0.0),
            brl: row.brl.unwrap_or(0.0),
            eur: row.eur.unwrap_or(0.0),
        };
        if ![account.usd, account.brl, account.eur].iter().all(|v| v.is_finite()) {
            return Err(LedgerError::Import(format!(
                "row {}: balance of '{}' is not a finite number",
                line + 2,
                account.name
            )));
        }

        let period = periods
            .last_mut()
            .ok_or_else(|| LedgerError::Import(format!("row {} has no period", line + 2)))?;
        period.accounts.push(account);
    }

    if let Some(period) = periods.last_mut() {
        period.totals = aggregate_totals(&period.accounts);
    }

    for period in &periods {
        period
            .rates
            .check_finite()
            .map_err(|e| LedgerError::Import(format!("week {}: {}", period.date, e)))?;
    }

    Ok(periods)
}

pub fn export_to_path(path: &Path, periods: &[Period]) -> Result<usize> {
    let file = std::fs::File::create(path)?;
    let rows = write_periods(file, periods)?;
    tracing::info!(path = %path.display(), periods = periods.len(), rows, "Exported history");
    Ok(rows)
}

pub fn import_from_path(path: &Path) -> Result<Vec<Period>> {
    let file = std::fs::File::open(path)?;
    let periods = read_periods(file)?;
    tracing::info!(path = %path.display(), periods = periods.len(), "Read history export");
    Ok(periods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;
    use crate::entities::PeriodDraft;

    fn sample_history() -> Vec<Period> {
        let rates = ExchangeRateSet::new(5.0, 6.0, 60000.0);

        let mut first = PeriodDraft::new(NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(), rates);
        let a = first.add_account("Nubank");
        let b = first.add_account("Wise, USD");
        first.edit_balance(&a, Currency::BRL, 1500.0).unwrap();
        first.edit_balance(&b, Currency::USD, 300.0).unwrap();

        let empty = PeriodDraft::new(NaiveDate::from_ymd_opt(2024, 2, 12).unwrap(), ExchangeRateSet::cleared());

        vec![first.snapshot(), empty.snapshot()]
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let history = sample_history();
        let mut buffer = Vec::new();

        let rows = write_periods(&mut buffer, &history).unwrap();
        assert_eq!(rows, 3);

        let imported = read_periods(buffer.as_slice()).unwrap();
        assert_eq!(imported.len(), 2);

        for (original, copy) in history.iter().zip(&imported) {
            assert_ne!(copy.id, original.id);
            assert_eq!(copy.date, original.date);
            assert_eq!(copy.rates, original.rates);
            assert_eq!(copy.accounts, original.accounts);
            assert_eq!(copy.totals, original.totals);
        }
        assert!(imported[1].accounts.is_empty());
    }

    #[test]
    fn test_missing_balances_default_to_zero() {
        let csv_text = "\
period_id,date,saved_at,usd_to_brl,eur_to_brl,btc_to_usd,account_id,account,usd,brl,eur
p1,2024-01-01,2024-01-01T10:00:00Z,5,6,0,a1,Cash,,100,
";
        let imported = read_periods(csv_text.as_bytes()).unwrap();
        assert_eq!(imported.len(), 1);
        let account = &imported[0].accounts[0];
        assert_eq!(account.id, "a1");
        assert_eq!(account.usd, 0.0);
        assert_eq!(account.brl, 100.0);
        assert_eq!(imported[0].totals.brl, 100.0);
    }

    #[test]
    fn test_account_with_empty_name_survives_round_trip() {
        let rates = ExchangeRateSet::new(5.0, 6.0, 0.0);
        let mut draft = PeriodDraft::new(NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(), rates);
        let id = draft.add_account("");
        draft.edit_balance(&id, Currency::BRL, 100.0).unwrap();
        let history = vec![draft.snapshot()];

        let mut buffer = Vec::new();
        write_periods(&mut buffer, &history).unwrap();
        let imported = read_periods(buffer.as_slice()).unwrap();

        assert_eq!(imported[0].accounts.len(), 1);
        assert_eq!(imported[0].accounts[0].name, "");
        assert_eq!(imported[0].accounts, history[0].accounts);
        assert_eq!(imported[0].totals, history[0].totals);
    }

    #[test]
    fn test_non_finite_balance_is_rejected() {
        let csv_text = "\
period_id,date,saved_at,usd_to_brl,eur_to_brl,btc_to_usd,account_id,account,usd,brl,eur
p1,2024-01-01,2024-01-01T10:00:00Z,5,6,0,a1,Cash,inf,100,1
";
        assert!(matches!(read_periods(csv_text.as_bytes()), Err(LedgerError::Import(_))));
    }

    #[test]
    fn test_malformed_csv_is_an_error() {
        let csv_text = "period_id,date\np1,not-a-date\n";
        assert!(read_periods(csv_text.as_bytes()).is_err());
    }
}
