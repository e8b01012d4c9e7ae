//! Price string parsing into fixed-point decimals, plus currency detection.
//!
//! Separator policy: when both `,` and `.` appear, the comma is a thousands
//! separator; a lone comma is a decimal separator. Amounts outside the
//! plausible band are discarded entirely.

use rust_decimal::Decimal;

/// Parsed amounts outside this band are discarded.
const MIN_AMOUNT: &str = "0.01";
const MAX_AMOUNT: &str = "1000000";

/// Currency symbols in match-priority order; two-character symbols first so
/// `A$` never reads as a bare `$`.
const SYMBOLS: &[(&str, &str)] = &[
    ("A$", "AUD"),
    ("C$", "CAD"),
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("₹", "INR"),
];

/// ISO 4217 codes recognized inside free text.
const CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "INR", "AUD", "CAD", "CHF", "CNY", "SEK", "NOK", "DKK", "NZD",
    "PLN",
];

/// Parse a price-like string into a two-decimal amount.
///
/// Returns `None` for unparseable input and for amounts outside the
/// plausible band.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let has_comma = cleaned.contains(',');
    let has_point = cleaned.contains('.');

    if has_comma && has_point {
        cleaned.retain(|c| c != ',');
    } else if has_comma {
        cleaned = cleaned.replace(',', ".");
        // More than one decimal point means it was really a thousands
        // separator chain ("1,299,000").
        if cleaned.matches('.').count() > 1 {
            cleaned.retain(|c| c != '.');
        }
    }

    let amount: Decimal = cleaned.parse().ok()?;
    let amount = amount.round_dp(2);

    let min: Decimal = MIN_AMOUNT.parse().expect("valid min bound");
    let max: Decimal = MAX_AMOUNT.parse().expect("valid max bound");
    ((min..=max).contains(&amount)).then_some(amount)
}

/// Detect a currency from symbols or ISO codes present in the string.
#[must_use]
pub fn detect_currency(raw: &str) -> Option<&'static str> {
    for (symbol, code) in SYMBOLS {
        if raw.contains(symbol) {
            return Some(code);
        }
    }

    let upper = raw.to_uppercase();
    for code in CODES {
        if let Some(pos) = upper.find(code) {
            let before_ok = pos == 0
                || !upper[..pos]
                    .chars()
                    .next_back()
                    .is_some_and(char::is_alphanumeric);
            let after = &upper[pos + code.len()..];
            let after_ok = after.chars().next().is_none_or(|c| !c.is_alphabetic());
            if before_ok && after_ok {
                return Some(code);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal literal")
    }

    #[test]
    fn parses_symbol_prefixed_amounts() {
        assert_eq!(parse_amount("$29.99"), Some(dec("29.99")));
        assert_eq!(parse_amount("€ 1 234.50"), Some(dec("1234.50")));
    }

    #[test]
    fn comma_and_point_means_thousands_comma() {
        assert_eq!(parse_amount("1,299.00"), Some(dec("1299.00")));
    }

    #[test]
    fn lone_comma_is_decimal_separator() {
        assert_eq!(parse_amount("29,99"), Some(dec("29.99")));
    }

    #[test]
    fn multi_comma_chain_collapses_to_digits() {
        // Comma chains are thousands separators; this amount then lands
        // outside the plausible band and is discarded.
        assert_eq!(parse_amount("12,345,678"), None);
    }

    #[test]
    fn out_of_band_amounts_are_discarded() {
        assert_eq!(parse_amount("0.001"), None);
        assert_eq!(parse_amount("99999999"), None);
    }

    #[test]
    fn garbage_is_discarded() {
        assert_eq!(parse_amount("free"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("..,"), None);
    }

    #[test]
    fn detects_symbols_with_two_char_priority() {
        assert_eq!(detect_currency("$10"), Some("USD"));
        assert_eq!(detect_currency("A$10"), Some("AUD"));
        assert_eq!(detect_currency("C$10"), Some("CAD"));
        assert_eq!(detect_currency("£10"), Some("GBP"));
        assert_eq!(detect_currency("₹500"), Some("INR"));
    }

    #[test]
    fn detects_iso_codes_on_word_boundaries() {
        assert_eq!(detect_currency("price: 49.50 EUR"), Some("EUR"));
        assert_eq!(detect_currency("usd 12.00"), Some("USD"));
        assert_eq!(detect_currency("HUSDLE"), None);
    }

    #[test]
    fn no_currency_yields_none() {
        assert_eq!(detect_currency("29.99"), None);
    }
}
