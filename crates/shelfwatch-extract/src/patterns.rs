//! Regex families for price-like and stock-like strings in free text.

use regex::Regex;

/// Whole-number candidates outside this band are discarded as implausible
/// prices (years, pixel sizes, SKU fragments).
const WHOLE_NUMBER_MIN: u64 = 10;
const WHOLE_NUMBER_MAX: u64 = 99_999;

/// Every substring of `text` that plausibly denotes a price, in order:
/// currency-symbol prefixed, two-decimal forms, currency-code prefixed, and
/// plausible whole numbers.
#[must_use]
pub fn price_like_strings(text: &str) -> Vec<String> {
    let mut out = Vec::new();

    let symbol = Regex::new(r"(?:A\$|C\$|[$€£¥₹])\s*\d[\d,]*(?:\.\d{1,2})?")
        .expect("valid symbol-price regex");
    for m in symbol.find_iter(text) {
        out.push(m.as_str().trim().to_string());
    }

    let decimal = Regex::new(r"\b\d{1,3}(?:,\d{3})*\.\d{2}\b|\b\d+,\d{2}\b")
        .expect("valid decimal-price regex");
    for m in decimal.find_iter(text) {
        out.push(m.as_str().to_string());
    }

    let coded = Regex::new(r"\b(?:USD|EUR|GBP|JPY|INR|AUD|CAD)\s*\d[\d,]*(?:\.\d{1,2})?")
        .expect("valid coded-price regex");
    for m in coded.find_iter(text) {
        out.push(m.as_str().to_string());
    }

    let whole = Regex::new(r"\b\d{2,6}\b").expect("valid whole-number regex");
    for m in whole.find_iter(text) {
        if let Ok(n) = m.as_str().parse::<u64>() {
            if (WHOLE_NUMBER_MIN..=WHOLE_NUMBER_MAX).contains(&n) {
                out.push(m.as_str().to_string());
            }
        }
    }

    out.dedup();
    out
}

/// Every substring of `text` that plausibly describes stock state.
#[must_use]
pub fn stock_like_strings(text: &str) -> Vec<String> {
    let phrases = Regex::new(
        r"(?i)\b(?:back in stock|in[- ]stock|out[- ]of[- ]stock|sold[- ]out|currently unavailable|unavailable|available now|only \d+ left|\d+ left in stock|low stock|limited stock|back[- ]?order(?:ed)?|pre[- ]?order|pre[- ]?sale|availability\s*[:=]\s*[a-z ]{2,30})",
    )
    .expect("valid stock-phrase regex");

    let mut out: Vec<String> = phrases
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .collect();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_symbol_prefixed_prices() {
        let hits = price_like_strings("Now $29.99, was €35");
        assert!(hits.contains(&"$29.99".to_string()));
        assert!(hits.contains(&"€35".to_string()));
    }

    #[test]
    fn finds_two_decimal_forms() {
        let hits = price_like_strings("total 1,299.00 incl. tax");
        assert!(hits.contains(&"1,299.00".to_string()));
    }

    #[test]
    fn finds_code_prefixed_prices() {
        let hits = price_like_strings("USD 49.50 per unit");
        assert!(hits.contains(&"USD 49.50".to_string()));
    }

    #[test]
    fn whole_numbers_are_band_filtered() {
        let hits = price_like_strings("order 5 of item 1234567 for 250");
        assert!(hits.contains(&"250".to_string()));
        assert!(!hits.contains(&"5".to_string()));
        assert!(!hits.contains(&"1234567".to_string()));
    }

    #[test]
    fn finds_stock_phrases() {
        let hits = stock_like_strings("Hurry — only 3 left! Otherwise sold out.");
        assert!(hits.iter().any(|h| h.eq_ignore_ascii_case("only 3 left")));
        assert!(hits.iter().any(|h| h.eq_ignore_ascii_case("sold out")));
    }

    #[test]
    fn finds_availability_labels() {
        let hits = stock_like_strings("Availability: in stock");
        assert!(!hits.is_empty());
    }
}
