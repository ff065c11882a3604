// Account Balance - one named holding expressed in three currencies
//
// "Account name is a VALUE (can change), Account UUID is IDENTITY"
//
// The three balance fields always describe the same economic value. Editing
// one field overwrites the other two by converting through the BRL pivot
// with the rates in force at the time of the edit. Later rate changes do
// not touch balances that were already entered.

use serde::{Deserialize, Serialize};

use crate::currency::{convert, Currency, ExchangeRateSet};

// ============================================================================
// ACCOUNT BALANCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Opaque identity, unique within a period
    pub id: String,

    /// Display name (free text, not required to be unique)
    pub name: String,

    pub usd: f64,
    pub brl: f64,
    pub eur: f64,
}

impl AccountBalance {
    /// New account with a fresh UUID and zero balances
    pub fn new(name: impl Into<String>) -> Self {
        AccountBalance {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            usd: 0.0,
            brl: 0.0,
            eur: 0.0,
        }
    }

    pub fn balance(&self, currency: Currency) -> f64 {
        match currency {
            Currency::USD => self.usd,
            Currency::BRL => self.brl,
            Currency::EUR => self.eur,
        }
    }

    fn field_mut(&mut self, currency: Currency) -> &mut f64 {
        match currency {
            Currency::USD => &mut self.usd,
            Currency::BRL => &mut self.brl,
            Currency::EUR => &mut self.eur,
        }
    }

    /// Edit one currency field and re-derive the other two
    pub fn set_balance(&mut self, currency: Currency, value: f64, rates: &ExchangeRateSet) {
        recompute_linked_balances(self, currency, value, rates);
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Same name, new identity, balances reset to zero (start of a new week)
    pub fn zeroed_copy(&self) -> AccountBalance {
        AccountBalance::new(self.name.clone())
    }
}

/// Overwrite `edited` with `new_value` and the two other fields with its
/// conversion under `rates`.
pub fn recompute_linked_balances(
    account: &mut AccountBalance,
    edited: Currency,
    new_value: f64,
    rates: &ExchangeRateSet,
) {
    *account.field_mut(edited) = new_value;
    for other in edited.others() {
        *account.field_mut(other) = convert(new_value, edited, other, rates);
    }
}

// ============================================================================
// TESTS
// ============================================================================
