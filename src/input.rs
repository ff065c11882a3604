//! Normalization of user-typed numbers before they reach the engine.
//!
//! The engine only ever sees finite `f64` values. Anything that does not
//! parse as a finite number becomes `0.0` here.

/// Parse a typed amount.
///
/// Accepts `.` or `,` as decimal separator. When both appear, the last one
/// is the decimal separator and the other is treated as grouping
/// (`1.234,56` and `1,234.56` both give `1234.56`). A separator that
/// repeats with no other separator present is grouping (`1.000.000`).
/// Currency symbols, spaces and underscores are ignored.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | ' ' | '_' | '\u{a0}'))
        .collect();

    let normalized = normalize_separators(&cleaned);
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Parse a typed exchange rate. Same rules as [`parse_amount`]; negative
/// input is kept so the caller's rate check can reject it.
pub fn parse_rate(raw: &str) -> f64 {
    parse_amount(raw)
}

fn normalize_separators(s: &str) -> String {
    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');

    match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            let (decimal, grouping) = if dot > comma { ('.', ',') } else { (',', '.') };
            s.chars()
                .filter(|&c| c != grouping)
                .map(|c| if c == decimal { '.' } else { c })
                .collect()
        }
        (None, Some(_)) => single_separator(s, ','),
        (Some(_), None) => single_separator(s, '.'),
        (None, None) => s.to_string(),
    }
}

fn single_separator(s: &str, sep: char) -> String {
    if s.matches(sep).count() > 1 {
        s.chars().filter(|&c| c != sep).collect()
    } else {
        s.replace(sep, ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_amount("200"), 200.0);
        assert_eq!(parse_amount("  5.5 "), 5.5);
        assert_eq!(parse_amount("-42.25"), -42.25);
    }

    #[test]
    fn test_comma_decimal() {
        assert_eq!(parse_amount("5,5"), 5.5);
        assert_eq!(parse_amount("1.234,56"), 1234.56);
        assert_eq!(parse_amount("1,234.56"), 1234.56);
    }

    #[test]
    fn test_grouping_only() {
        assert_eq!(parse_amount("1.000.000"), 1_000_000.0);
        assert_eq!(parse_amount("2,500,000"), 2_500_000.0);
    }

    #[test]
    fn test_currency_symbols() {
        assert_eq!(parse_amount("R$ 1.500,00"), 1500.0);
        assert_eq!(parse_amount("$300"), 300.0);
        assert_eq!(parse_amount("€ 12,5"), 12.5);
    }

    #[test]
    fn test_garbage_becomes_zero() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("NaN"), 0.0);
        assert_eq!(parse_amount("inf"), 0.0);
        assert_eq!(parse_amount("1e400"), 0.0);
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("5,43"), 5.43);
        assert_eq!(parse_rate(""), 0.0);
    }
}
