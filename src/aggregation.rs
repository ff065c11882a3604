//! Period totals, single-currency portfolio value and trend series.

use serde::{Deserialize, Serialize};

use crate::currency::{convert, Currency, ExchangeRateSet};
use crate::entities::{AccountBalance, Period};

// ============================================================================
// TOTALS
// ============================================================================

/// Per-currency sums over a period's accounts
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub usd: f64,
    pub brl: f64,
    pub eur: f64,
}

impl Totals {
    pub fn get(&self, currency: Currency) -> f64 {
        match currency {
            Currency::USD => self.usd,
            Currency::BRL => self.brl,
            Currency::EUR => self.eur,
        }
    }

    /// Convert each column into `target` with `rates` and sum
    pub fn in_currency(&self, target: Currency, rates: &ExchangeRateSet) -> f64 {
        Currency::all()
            .iter()
            .map(|&c| convert(self.get(c), c, target, rates))
            .sum()
    }
}

/// Sum usd, brl and eur independently. Empty input yields zeros.
pub fn aggregate_totals(accounts: &[AccountBalance]) -> Totals {
    accounts.iter().fold(Totals::default(), |acc, a| Totals {
        usd: acc.usd + a.usd,
        brl: acc.brl + a.brl,
        eur: acc.eur + a.eur,
    })
}

/// Whole-portfolio value of `period` in `target`, using the period's own rates
pub fn total_in_currency(period: &Period, target: Currency) -> f64 {
    period.totals.in_currency(target, &period.rates)
}

// ============================================================================
// TREND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

impl Direction {
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Up => "▲",
            Direction::Down => "▼",
            Direction::Neutral => "–",
        }
    }
}

/// Period-over-period change. `percent` is `None` when there was nothing to
/// compare against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub percent: Option<f64>,
    pub direction: Direction,
}

impl Trend {
    pub fn neutral() -> Self {
        Trend {
            percent: None,
            direction: Direction::Neutral,
        }
    }
}

/// `((current - previous) / previous) * 100`, or a neutral trend when
/// `previous` is missing or zero.
pub fn percent_change(current: f64, previous: Option<f64>) -> Trend {
    let previous = match previous {
        Some(p) if p != 0.0 => p,
        _ => return Trend::neutral(),
    };

    let percent = ((current - previous) / previous) * 100.0;
    let direction = if percent > 0.0 {
        Direction::Up
    } else if percent < 0.0 {
        Direction::Down
    } else {
        Direction::Neutral
    };

    Trend {
        percent: Some(percent),
        direction,
    }
}

// ============================================================================
// SERIES
// ============================================================================

/// One period's portfolio value in the comparison currency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonPoint {
    pub period_id: String,
    pub date: chrono::NaiveDate,
    pub total: f64,
    pub change: Trend,
}

/// Roll saved periods into a single-currency series. Each point's change is
/// measured against the point before it; the first point is neutral.
pub fn comparison_series(periods: &[Period], target: Currency) -> Vec<ComparisonPoint> {
    let mut previous: Option<f64> = None;
    periods
        .iter()
        .map(|period| {
            let total = total_in_currency(period, target);
            let point = ComparisonPoint {
                period_id: period.id.clone(),
                date: period.date,
                total,
                change: percent_change(total, previous),
            };
            previous = Some(total);
            point
        })
        .collect()
}

/// One period's recorded value for a single account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountPoint {
    pub period_id: String,
    pub date: chrono::NaiveDate,
    pub value: f64,
    pub change: Trend,
}

/// Trend line for one account across periods.
///
/// Account ids are regenerated every week, so accounts are matched by exact
/// name. Periods without the account are skipped. When a period holds
/// several accounts with the same name their values are summed.
pub fn account_series(periods: &[Period], account_name: &str, currency: Currency) -> Vec<AccountPoint> {
    let mut previous: Option<f64> = None;
    let mut points = Vec::new();

    for period in periods {
        let mut matching = period
            .accounts
            .iter()
            .filter(|a| a.name == account_name)
            .peekable();
        if matching.peek().is_none() {
            continue;
        }

        let value: f64 = matching.map(|a| a.balance(currency)).sum();
        points.push(AccountPoint {
            period_id: period.id.clone(),
            date: period.date,
            value,
            change: percent_change(value, previous),
        });
        previous = Some(value);
    }

    points
}

/// Share of the combined value held in each recorded currency column
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Allocation {
    pub usd: f64,
    pub brl: f64,
    pub eur: f64,
}

/// Each totals column converted to `target`, as a fraction of their sum.
/// A zero combined value yields all-zero shares.
pub fn currency_allocation(totals: &Totals, rates: &ExchangeRateSet, target: Currency) -> Allocation {
    let usd = convert(totals.usd, Currency::USD, target, rates);
    let brl = convert(totals.brl, Currency::BRL, target, rates);
    let eur = convert(totals.eur, Currency::EUR, target, rates);
    let combined = usd + brl + eur;

    if combined == 0.0 {
        return Allocation::default();
    }

    Allocation {
        usd: usd / combined,
        brl: brl / combined,
        eur: eur / combined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn account(name: &str, usd: f64, brl: f64, eur: f64) -> AccountBalance {
        AccountBalance {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            usd,
            brl,
            eur,
        }
    }

    fn period(day: u32, rates: ExchangeRateSet, accounts: Vec<AccountBalance>) -> Period {
        Period::from_parts(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            rates,
            accounts,
        )
    }

    #[test]
    fn test_aggregate_empty() {
        assert_eq!(aggregate_totals(&[]), Totals { usd: 0.0, brl: 0.0, eur: 0.0 });
    }

    #[test]
    fn test_aggregate_sums_each_column() {
        let totals = aggregate_totals(&[
            account("a", 10.0, 50.0, 8.0),
            account("b", 5.0, 25.0, 4.0),
        ]);
        assert_eq!(totals, Totals { usd: 15.0, brl: 75.0, eur: 12.0 });
    }

    #[test]
    fn test_total_in_currency() {
        let p = period(1, ExchangeRateSet::new(5.0, 6.0, 0.0), vec![account("a", 0.0, 1000.0, 0.0)]);
        assert_eq!(total_in_currency(&p, Currency::USD), 200.0);
    }

    #[test]
    fn test_total_in_currency_converts_each_column() {
        let p = period(
            1,
            ExchangeRateSet::new(5.0, 6.0, 0.0),
            vec![account("a", 100.0, 500.0, 0.0), account("b", 0.0, 0.0, 10.0)],
        );
        // 100 USD + 500 BRL + 10 EUR expressed in BRL
        assert_eq!(total_in_currency(&p, Currency::BRL), 500.0 + 500.0 + 60.0);
    }

    #[test]
    fn test_percent_change() {
        let up = percent_change(110.0, Some(100.0));
        assert_eq!(up.percent, Some(10.0));
        assert_eq!(up.direction, Direction::Up);

        let down = percent_change(90.0, Some(100.0));
        assert_eq!(down.percent, Some(-10.0));
        assert_eq!(down.direction, Direction::Down);

        let flat = percent_change(100.0, Some(100.0));
        assert_eq!(flat.percent, Some(0.0));
        assert_eq!(flat.direction, Direction::Neutral);
    }

    #[test]
    fn test_percent_change_without_baseline() {
        assert_eq!(percent_change(123.0, Some(0.0)), Trend::neutral());
        assert_eq!(percent_change(123.0, None), Trend::neutral());
    }

    #[test]
    fn test_comparison_series() {
        let rates = ExchangeRateSet::new(5.0, 6.0, 0.0);
        let periods = vec![
            period(1, rates, vec![account("a", 0.0, 1000.0, 0.0)]),
            period(8, rates, vec![account("a", 0.0, 1100.0, 0.0)]),
            period(15, rates, vec![account("a", 0.0, 990.0, 0.0)]),
        ];

        let series = comparison_series(&periods, Currency::BRL);

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].change, Trend::neutral());
        assert_eq!(series[1].total, 1100.0);
        assert_eq!(series[1].change.direction, Direction::Up);
        assert_relative_eq!(series[1].change.percent.unwrap(), 10.0, epsilon = 1e-9);
        assert_eq!(series[2].change.direction, Direction::Down);
        assert_relative_eq!(series[2].change.percent.unwrap(), -10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_account_series_matches_by_name() {
        let rates = ExchangeRateSet::new(5.0, 6.0, 0.0);
        let periods = vec![
            period(1, rates, vec![account("Nubank", 0.0, 100.0, 0.0)]),
            period(8, rates, vec![account("Other", 0.0, 5.0, 0.0)]),
            period(15, rates, vec![account("Nubank", 0.0, 150.0, 0.0)]),
        ];

        let series = account_series(&periods, "Nubank", Currency::BRL);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].value, 100.0);
        assert_eq!(series[1].value, 150.0);
        assert_eq!(series[1].change.percent, Some(50.0));
    }

    #[test]
    fn test_currency_allocation() {
        let rates = ExchangeRateSet::new(5.0, 6.0, 0.0);
        let totals = Totals { usd: 100.0, brl: 500.0, eur: 0.0 };

        let allocation = currency_allocation(&totals, &rates, Currency::BRL);
        assert_eq!(allocation.usd, 0.5);
        assert_eq!(allocation.brl, 0.5);
        assert_eq!(allocation.eur, 0.0);

        assert_eq!(
            currency_allocation(&Totals::default(), &rates, Currency::USD),
            Allocation::default()
        );
    }

    proptest! {
        #[test]
        fn aggregate_is_order_independent(
            values in proptest::collection::vec((-1.0e6f64..1.0e6, -1.0e6f64..1.0e6, -1.0e6f64..1.0e6), 0..20),
        ) {
            let accounts: Vec<AccountBalance> = values
                .iter()
                .map(|&(u, b, e)| account("x", u, b, e))
                .collect();
            let mut reversed = accounts.clone();
            reversed.reverse();

            let forward = aggregate_totals(&accounts);
            let backward = aggregate_totals(&reversed);

            let tolerance = 1e-4;
            prop_assert!((forward.usd - backward.usd).abs() <= tolerance);
            prop_assert!((forward.brl - backward.brl).abs() <= tolerance);
            prop_assert!((forward.eur - backward.eur).abs() <= tolerance);
        }

        #[test]
        fn zero_baseline_is_always_neutral(current in proptest::num::f64::ANY) {
            prop_assert_eq!(percent_change(current, Some(0.0)), Trend::neutral());
        }
    }
}
