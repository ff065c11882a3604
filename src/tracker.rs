//! Application facade: the draft week, saved history and change signals.
//!
//! Every draft mutation is persisted through the injected store before the
//! call returns, then announced with [`ChangeEvent::DraftChanged`].

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::aggregation::{
    account_series, comparison_series, currency_allocation, percent_change, AccountPoint, Allocation,
    ComparisonPoint, Totals, Trend,
};
use crate::config::TrackerSettings;
use crate::currency::{Currency, ExchangeRateSet};
use crate::entities::{AccountBalance, Period, PeriodDraft};
use crate::error::{LedgerError, Result};
use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::repository::LedgerStore;

/// Headline numbers for the draft against the last saved week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub currency: Currency,
    pub draft_total: f64,
    pub draft_totals: Totals,
    pub allocation: Allocation,
    pub last_saved_total: Option<f64>,
    pub change: Trend,
    pub saved_periods: usize,
}

pub struct Tracker {
    store: Box<dyn LedgerStore>,
    notifier: ChangeNotifier,
    settings: TrackerSettings,
    draft: PeriodDraft,
}

impl Tracker {
    /// Open the tracker on `store`.
    ///
    /// The persisted draft is restored when present. Otherwise a draft is
    /// derived from the latest saved week (rates carried per settings), or
    /// an empty one dated today.
    pub fn open(
        store: Box<dyn LedgerStore>,
        notifier: ChangeNotifier,
        settings: TrackerSettings,
    ) -> Result<Self> {
        let draft = match store.load_draft()? {
            Some(draft) => draft,
            None => {
                let today = Utc::now().date_naive();
                match store.latest()? {
                    Some(latest) => PeriodDraft::next_from(&latest, settings.carry_forward_rates, today),
                    None => PeriodDraft::new(today, ExchangeRateSet::cleared()),
                }
            }
        };

        tracing::debug!(accounts = draft.accounts().len(), date = %draft.date, "Tracker opened");

        Ok(Tracker {
            store,
            notifier,
            settings,
            draft,
        })
    }

    pub fn draft(&self) -> &PeriodDraft {
        &self.draft
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    // ========================================================================
    // DRAFT EDITING
    // ========================================================================

    pub fn set_rates(&mut self, rates: ExchangeRateSet) -> Result<()> {
        self.draft.set_rates(rates)?;
        tracing::debug!(
            usd_to_brl = rates.usd_to_brl,
            eur_to_brl = rates.eur_to_brl,
            btc_to_usd = rates.btc_to_usd,
            "Rates updated"
        );
        self.persist_draft()
    }

    pub fn set_date(&mut self, date: NaiveDate) -> Result<()> {
        self.draft.set_date(date);
        self.persist_draft()
    }

    pub fn add_account(&mut self, name: &str) -> Result<String> {
        let id = self.draft.add_account(name);
        tracing::debug!(%id, name, "Account added");
        self.persist_draft()?;
        Ok(id)
    }

    pub fn rename_account(&mut self, id: &str, name: &str) -> Result<()> {
        self.draft.rename_account(id, name)?;
        self.persist_draft()
    }

    pub fn remove_account(&mut self, id: &str) -> Result<AccountBalance> {
        let removed = self.draft.remove_account(id)?;
        tracing::debug!(id, name = %removed.name, "Account removed");
        self.persist_draft()?;
        Ok(removed)
    }

    pub fn move_account(&mut self, from: usize, to: usize) -> Result<()> {
        self.draft.move_account(from, to)?;
        self.persist_draft()
    }

    pub fn edit_balance(&mut self, id: &str, currency: Currency, value: f64) -> Result<AccountBalance> {
        let account = self.draft.edit_balance(id, currency, value)?.clone();
        tracing::debug!(id, %currency, value, "Balance edited");
        self.persist_draft()?;
        Ok(account)
    }

    /// Resolve a user-supplied account reference: exact id, 1-based
    /// position, or a unique id prefix.
    pub fn find_account(&self, key: &str) -> Result<&AccountBalance> {
        let accounts = self.draft.accounts();

        if let Some(account) = accounts.iter().find(|a| a.id == key) {
            return Ok(account);
        }
        if let Ok(position) = key.parse::<usize>() {
            if position >= 1 && position <= accounts.len() {
                return Ok(&accounts[position - 1]);
            }
        }

        let mut prefixed = accounts.iter().filter(|a| a.id.starts_with(key));
        match (prefixed.next(), prefixed.next()) {
            (Some(account), None) if !key.is_empty() => Ok(account),
            _ => Err(LedgerError::AccountNotFound(key.to_string())),
        }
    }

    // ========================================================================
    // PERIOD LIFECYCLE
    // ========================================================================

    /// Append the draft to history as an immutable snapshot
    pub fn save_period(&mut self) -> Result<Period> {
        let period = self.draft.snapshot();
        self.store.append(&period)?;

        tracing::info!(
            id = %period.id,
            date = %period.date,
            accounts = period.accounts.len(),
            "Period saved"
        );
        self.notifier.notify(&ChangeEvent::PeriodSaved { id: period.id.clone() });
        Ok(period)
    }

    /// Replace the draft with a fresh week built from the latest saved
    /// period. Without history, the current draft's accounts are reused.
    pub fn start_new_period(&mut self, carry_rates: bool, date: NaiveDate) -> Result<&PeriodDraft> {
        let base = match self.store.latest()? {
            Some(latest) => latest,
            None => self.draft.snapshot(),
        };

        self.draft = PeriodDraft::next_from(&base, carry_rates, date);
        tracing::info!(%date, carry_rates, accounts = self.draft.accounts().len(), "New period started");
        self.persist_draft()?;
        Ok(&self.draft)
    }

    pub fn history(&self) -> Result<Vec<Period>> {
        self.store.load_all()
    }

    /// Append externally produced periods (CSV import) after existing history
    pub fn append_periods(&mut self, periods: &[Period]) -> Result<usize> {
        for period in periods {
            self.store.append(period)?;
            self.notifier.notify(&ChangeEvent::PeriodSaved { id: period.id.clone() });
        }
        Ok(periods.len())
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.store.clear()?;
        tracing::info!("History cleared");
        self.notifier.notify(&ChangeEvent::HistoryCleared);
        Ok(())
    }

    // ========================================================================
    // VIEWS
    // ========================================================================

    pub fn comparison(&self, target: Currency) -> Result<Vec<ComparisonPoint>> {
        Ok(comparison_series(&self.history()?, target))
    }

    pub fn account_history(&self, name: &str, currency: Currency) -> Result<Vec<AccountPoint>> {
        Ok(account_series(&self.history()?, name, currency))
    }

    /// Trend of the two most recent saved weeks
    pub fn latest_trend(&self, target: Currency) -> Result<Trend> {
        let series = self.comparison(target)?;
        Ok(series.last().map(|p| p.change).unwrap_or_else(Trend::neutral))
    }

    /// Draft total against the last saved week
    pub fn summary(&self, target: Currency) -> Result<Summary> {
        let history = self.history()?;
        let totals = self.draft.totals();
        let rates = self.draft.rates();
        let draft_total = totals.in_currency(target, rates);
        let last_saved_total = history.last().map(|p| p.total_in(target));

        Ok(Summary {
            currency: target,
            draft_total,
            draft_totals: totals,
            allocation: currency_allocation(&totals, rates, target),
            last_saved_total,
            change: percent_change(draft_total, last_saved_total),
            saved_periods: history.len(),
        })
    }

    fn persist_draft(&mut self) -> Result<()> {
        self.store.save_draft(&self.draft)?;
        self.notifier.notify(&ChangeEvent::DraftChanged);
        Ok(())
    }
}
