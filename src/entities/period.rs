// Period Entity - one week's rates and balances
//
// A week starts as a PeriodDraft that is edited freely. Saving produces a
// Period: an immutable snapshot appended to history. Starting the next
// week keeps the account list (same names, same order, fresh ids, zero
// balances) and either carries the rates forward or clears them.
//
// Totals are recomputed on every mutation of the draft, so they are never
// stale relative to the account list.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::{aggregate_totals, Totals};
use crate::currency::{Currency, ExchangeRateSet};
use crate::entities::account::AccountBalance;
use crate::error::{LedgerError, Result};

// ============================================================================
// PERIOD (saved snapshot)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub id: String,
    pub date: NaiveDate,
    pub rates: ExchangeRateSet,
    pub accounts: Vec<AccountBalance>,
    pub totals: Totals,
    pub saved_at: DateTime<Utc>,
}

impl Period {
    /// Build a snapshot with fresh id and totals derived from `accounts`
    pub fn from_parts(date: NaiveDate, rates: ExchangeRateSet, accounts: Vec<AccountBalance>) -> Self {
        let totals = aggregate_totals(&accounts);
        Period {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            rates,
            accounts,
            totals,
            saved_at: Utc::now(),
        }
    }

    /// Portfolio value in `target` under this period's rates
    pub fn total_in(&self, target: Currency) -> f64 {
        crate::aggregation::total_in_currency(self, target)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

// ============================================================================
// PERIOD DRAFT (mutable week under edit)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodDraft {
    pub date: NaiveDate,
    rates: ExchangeRateSet,
    accounts: Vec<AccountBalance>,
    totals: Totals,
}

impl PeriodDraft {
    /// Empty draft for `date`
    pub fn new(date: NaiveDate, rates: ExchangeRateSet) -> Self {
        PeriodDraft {
            date,
            rates,
            accounts: Vec::new(),
            totals: Totals::default(),
        }
    }

    /// Draft for the week after `previous`.
    ///
    /// Account names and order are preserved with new ids and zero balances.
    /// Rates are copied when `carry_rates` is set, cleared otherwise.
    pub fn next_from(previous: &Period, carry_rates: bool, date: NaiveDate) -> Self {
        let rates = if carry_rates {
            previous.rates
        } else {
            ExchangeRateSet::cleared()
        };
        let accounts: Vec<AccountBalance> = previous.accounts.iter().map(|a| a.zeroed_copy()).collect();

        let mut draft = PeriodDraft::new(date, rates);
        draft.accounts = accounts;
        draft.refresh_totals();
        draft
    }

    pub fn rates(&self) -> &ExchangeRateSet {
        &self.rates
    }

    pub fn accounts(&self) -> &[AccountBalance] {
        &self.accounts
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn account(&self, id: &str) -> Option<&AccountBalance> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// Replace the rate set. Balances already entered keep their values.
    /// Non-finite rates are rejected and the current set is kept.
    pub fn set_rates(&mut self, rates: ExchangeRateSet) -> Result<()> {
        rates.check_finite()?;
        self.rates = rates;
        Ok(())
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    /// Append a zero-balance account and return its id
    pub fn add_account(&mut self, name: impl Into<String>) -> String {
        let account = AccountBalance::new(name);
        let id = account.id.clone();
        self.accounts.push(account);
        self.refresh_totals();
        id
    }

    pub fn rename_account(&mut self, id: &str, name: impl Into<String>) -> Result<()> {
        self.account_mut(id)?.rename(name);
        Ok(())
    }

    pub fn remove_account(&mut self, id: &str) -> Result<AccountBalance> {
        let index = self.position(id)?;
        let removed = self.accounts.remove(index);
        self.refresh_totals();
        Ok(removed)
    }

    /// Move the account at `from` so it ends up at `to` (drag-and-drop reorder)
    pub fn move_account(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.accounts.len();
        if from >= len {
            return Err(LedgerError::InvalidIndex { index: from, len });
        }
        if to >= len {
            return Err(LedgerError::InvalidIndex { index: to, len });
        }
        let account = self.accounts.remove(from);
        self.accounts.insert(to, account);
        Ok(())
    }

    /// Edit one balance field of an account and re-derive the other two.
    ///
    /// Fails with `InvalidRate` before touching the account when either
    /// conversion rate is unusable; the two linked fields always need both.
    /// Fails with `NonFinite` when the value, one of its conversions or the
    /// resulting totals overflow, leaving the draft unchanged.
    pub fn edit_balance(&mut self, id: &str, currency: Currency, value: f64) -> Result<&AccountBalance> {
        self.rates.check(Currency::USD)?;
        self.rates.check(Currency::EUR)?;

        let rates = self.rates;
        let index = self.position(id)?;

        let mut edited = self.accounts[index].clone();
        edited.set_balance(currency, value, &rates);
        if let Some(bad) = Currency::all().into_iter().find(|&c| !edited.balance(c).is_finite()) {
            return Err(LedgerError::NonFinite {
                field: format!("{} balance", bad),
                value: edited.balance(bad),
            });
        }

        let previous = std::mem::replace(&mut self.accounts[index], edited);
        let totals = aggregate_totals(&self.accounts);
        if let Some(bad) = Currency::all().into_iter().find(|&c| !totals.get(c).is_finite()) {
            self.accounts[index] = previous;
            return Err(LedgerError::NonFinite {
                field: format!("{} total", bad),
                value: totals.get(bad),
            });
        }

        self.totals = totals;
        Ok(&self.accounts[index])
    }

    /// Immutable snapshot of the draft as it stands
    pub fn snapshot(&self) -> Period {
        Period::from_parts(self.date, self.rates, self.accounts.clone())
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    fn account_mut(&mut self, id: &str) -> Result<&mut AccountBalance> {
        self.accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    fn refresh_totals(&mut self) {
        self.totals = aggregate_totals(&self.accounts);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn rates() -> ExchangeRateSet {
        ExchangeRateSet::new(5.0, 6.0, 65000.0)
    }

    #[test]
    fn test_new_draft_is_empty() {
        let draft = PeriodDraft::new(date(1), rates());
        assert!(draft.accounts().is_empty());
        assert_eq!(draft.totals(), Totals::default());
    }

    #[test]
    fn test_totals_follow_every_mutation() {
        let mut draft = PeriodDraft::new(date(1), rates());
        let a = draft.add_account("Checking");
        let b = draft.add_account("Savings");

        draft.edit_balance(&a, Currency::USD, 100.0).unwrap();
        assert_eq!(draft.totals(), Totals { usd: 100.0, brl: 500.0, eur: 500.0 / 6.0 });

        draft.edit_balance(&b, Currency::BRL, 600.0).unwrap();
        assert_eq!(draft.totals().brl, 1100.0);
        assert_eq!(draft.totals().usd, 220.0);

        draft.remove_account(&a).unwrap();
        assert_eq!(draft.totals(), Totals { usd: 120.0, brl: 600.0, eur: 100.0 });
    }

    #[test]
    fn test_edit_rejects_invalid_rates() {
        let mut draft = PeriodDraft::new(date(1), ExchangeRateSet::cleared());
        let id = draft.add_account("Checking");

        let err = draft.edit_balance(&id, Currency::USD, 10.0).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRate { .. }));
        assert_eq!(draft.account(&id).unwrap().usd, 0.0);
    }

    #[test]
    fn test_edit_rejects_overflowing_balance() {
        let mut draft = PeriodDraft::new(date(1), rates());
        let id = draft.add_account("Checking");
        draft.edit_balance(&id, Currency::USD, 10.0).unwrap();

        let err = draft.edit_balance(&id, Currency::USD, 1e308).unwrap_err();
        assert!(matches!(err, LedgerError::NonFinite { .. }));
        assert_eq!(draft.account(&id).unwrap().usd, 10.0);
        assert_eq!(draft.totals().brl, 50.0);

        assert!(draft.edit_balance(&id, Currency::BRL, f64::NAN).is_err());
        assert_eq!(draft.account(&id).unwrap().brl, 50.0);
    }

    #[test]
    fn test_edit_rejects_overflowing_totals() {
        let mut draft = PeriodDraft::new(date(1), ExchangeRateSet::new(1.0, 1.0, 0.0));
        let a = draft.add_account("A");
        let b = draft.add_account("B");
        draft.edit_balance(&a, Currency::BRL, f64::MAX).unwrap();

        let err = draft.edit_balance(&b, Currency::BRL, f64::MAX).unwrap_err();
        assert!(matches!(err, LedgerError::NonFinite { .. }));
        assert_eq!(draft.account(&b).unwrap().brl, 0.0);
        assert_eq!(draft.totals().brl, f64::MAX);
    }

    #[test]
    fn test_set_rates_rejects_non_finite() {
        let mut draft = PeriodDraft::new(date(1), rates());
        let err = draft
            .set_rates(ExchangeRateSet::new(f64::INFINITY, 6.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NonFinite { .. }));
        assert!(draft.set_rates(ExchangeRateSet::new(5.0, 6.0, f64::NAN)).is_err());
        assert_eq!(draft.rates(), &rates());

        // Cleared rates are a legitimate state
        draft.set_rates(ExchangeRateSet::cleared()).unwrap();
    }

    #[test]
    fn test_edit_unknown_account() {
        let mut draft = PeriodDraft::new(date(1), rates());
        let err = draft.edit_balance("missing", Currency::BRL, 1.0).unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(_)));
    }

    #[test]
    fn test_move_account() {
        let mut draft = PeriodDraft::new(date(1), rates());
        draft.add_account("A");
        draft.add_account("B");
        draft.add_account("C");

        draft.move_account(0, 2).unwrap();
        let names: Vec<&str> = draft.accounts().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);

        draft.move_account(2, 0).unwrap();
        let names: Vec<&str> = draft.accounts().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        assert!(matches!(
            draft.move_account(3, 0),
            Err(LedgerError::InvalidIndex { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_rename_account() {
        let mut draft = PeriodDraft::new(date(1), rates());
        let id = draft.add_account("Old");
        draft.rename_account(&id, "New").unwrap();
        assert_eq!(draft.account(&id).unwrap().name, "New");
        assert!(draft.rename_account("missing", "x").is_err());
    }

    #[test]
    fn test_rate_change_does_not_touch_balances() {
        let mut draft = PeriodDraft::new(date(1), rates());
        let id = draft.add_account("Wise");
        draft.edit_balance(&id, Currency::USD, 100.0).unwrap();

        draft.set_rates(ExchangeRateSet::new(10.0, 12.0, 0.0)).unwrap();

        assert_eq!(draft.account(&id).unwrap().brl, 500.0);
        assert_eq!(draft.totals().brl, 500.0);
    }

    #[test]
    fn test_snapshot_copies_state() {
        let mut draft = PeriodDraft::new(date(1), rates());
        let id = draft.add_account("Checking");
        draft.edit_balance(&id, Currency::BRL, 1000.0).unwrap();

        let period = draft.snapshot();

        assert!(!period.id.is_empty());
        assert_eq!(period.date, date(1));
        assert_eq!(period.rates, rates());
        assert_eq!(period.accounts, draft.accounts());
        assert_eq!(period.totals, draft.totals());
        // 200 USD + 1000 BRL + 166.67 EUR, each worth 200 USD
        assert_relative_eq!(period.total_in(Currency::USD), 600.0, epsilon = 1e-9);
    }

    #[test]
    fn test_next_from_carries_rates_and_accounts() {
        let mut draft = PeriodDraft::new(date(1), rates());
        let a = draft.add_account("A");
        draft.add_account("B");
        draft.edit_balance(&a, Currency::BRL, 50.0).unwrap();
        let saved = draft.snapshot();

        let next = PeriodDraft::next_from(&saved, true, date(8));

        assert_eq!(next.date, date(8));
        assert_eq!(next.rates(), &rates());
        assert_eq!(next.totals(), Totals::default());
        let names: Vec<&str> = next.accounts().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        for (old, new) in saved.accounts.iter().zip(next.accounts()) {
            assert_ne!(old.id, new.id);
            assert_eq!(new.usd, 0.0);
            assert_eq!(new.brl, 0.0);
            assert_eq!(new.eur, 0.0);
        }
    }

    #[test]
    fn test_next_from_can_clear_rates() {
        let saved = PeriodDraft::new(date(1), rates()).snapshot();
        let next = PeriodDraft::next_from(&saved, false, date(8));
        assert_eq!(next.rates(), &ExchangeRateSet::cleared());
    }
}
