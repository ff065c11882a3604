//! Currencies, exchange-rate snapshots and the BRL-pivot conversion.
//!
//! Every cross-currency conversion goes through BRL: the amount is first
//! expressed in BRL and then divided into the target. USD to EUR is
//! therefore a multiplication followed by a division, never a direct
//! cross rate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, Result};

// ============================================================================
// CURRENCY
// ============================================================================

/// The three currencies a balance is tracked in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Currency {
    /// US Dollar
    USD,
    /// Brazilian Real (pivot)
    BRL,
    /// Euro
    EUR,
}

impl Currency {
    /// Pivot currency every conversion is routed through
    pub const PIVOT: Currency = Currency::BRL;

    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::BRL => "BRL",
            Currency::EUR => "EUR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::BRL => "R$",
            Currency::EUR => "€",
        }
    }

    /// Parse from ISO code (case-insensitive)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "BRL" => Some(Currency::BRL),
            "EUR" => Some(Currency::EUR),
            _ => None,
        }
    }

    pub fn all() -> [Currency; 3] {
        [Currency::USD, Currency::BRL, Currency::EUR]
    }

    /// The two currencies other than `self`, in `all()` order
    pub fn others(&self) -> [Currency; 2] {
        match self {
            Currency::USD => [Currency::BRL, Currency::EUR],
            Currency::BRL => [Currency::USD, Currency::EUR],
            Currency::EUR => [Currency::USD, Currency::BRL],
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Currency::from_code(s).ok_or_else(|| LedgerError::UnknownCurrency(s.to_string()))
    }
}

impl TryFrom<String> for Currency {
    type Error = LedgerError;

    fn try_from(code: String) -> Result<Self> {
        code.parse()
    }
}

// ============================================================================
// EXCHANGE RATE SET
// ============================================================================

/// Manually entered rates for one period.
///
/// BRL is the implicit base. `btc_to_usd` is recorded for reference only and
/// never takes part in a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExchangeRateSet {
    pub usd_to_brl: f64,
    pub eur_to_brl: f64,
    #[serde(default)]
    pub btc_to_usd: f64,
}

impl ExchangeRateSet {
    pub fn new(usd_to_brl: f64, eur_to_brl: f64, btc_to_usd: f64) -> Self {
        Self {
            usd_to_brl,
            eur_to_brl,
            btc_to_usd,
        }
    }

    /// All rates zero, as left behind when a new period does not carry rates forward
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Rate that turns one unit of `currency` into BRL. `None` for BRL itself.
    pub fn to_pivot(&self, currency: Currency) -> Option<f64> {
        match currency {
            Currency::USD => Some(self.usd_to_brl),
            Currency::EUR => Some(self.eur_to_brl),
            Currency::BRL => None,
        }
    }

    /// Check the rate used when `currency` enters or leaves the pivot
    pub fn check(&self, currency: Currency) -> Result<()> {
        match self.to_pivot(currency) {
            Some(rate) if !(rate.is_finite() && rate > 0.0) => {
                Err(LedgerError::InvalidRate { currency, rate })
            }
            _ => Ok(()),
        }
    }

    /// Every rate is a finite number. Zero is allowed (rates not entered yet).
    pub fn check_finite(&self) -> Result<()> {
        let fields = [
            ("usd_to_brl", self.usd_to_brl),
            ("eur_to_brl", self.eur_to_brl),
            ("btc_to_usd", self.btc_to_usd),
        ];
        match fields.iter().find(|(_, value)| !value.is_finite()) {
            Some((field, value)) => Err(LedgerError::NonFinite {
                field: field.to_string(),
                value: *value,
            }),
            None => Ok(()),
        }
    }

    /// Both conversion rates are usable (positive and finite)
    pub fn is_complete(&self) -> bool {
        self.check(Currency::USD).is_ok() && self.check(Currency::EUR).is_ok()
    }
}

// ============================================================================
// CONVERSION
// ============================================================================

/// Convert `amount` between currencies through the BRL pivot.
///
/// Same-currency conversion returns `amount` untouched. Rates are not
/// validated: a zero rate produces an infinite or NaN result.
pub fn convert(amount: f64, from: Currency, to: Currency, rates: &ExchangeRateSet) -> f64 {
    if from == to {
        return amount;
    }

    let in_brl = match rates.to_pivot(from) {
        Some(rate) => amount * rate,
        None => amount,
    };

    match rates.to_pivot(to) {
        Some(rate) => in_brl / rate,
        None => in_brl,
    }
}

/// [`convert`] that rejects zero, negative or non-finite rates on the route
pub fn try_convert(
    amount: f64,
    from: Currency,
    to: Currency,
    rates: &ExchangeRateSet,
) -> Result<f64> {
    if from == to {
        return Ok(amount);
    }
    rates.check(from)?;
    rates.check(to)?;
    Ok(convert(amount, from, to, rates))
}
