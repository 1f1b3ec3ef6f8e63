//! Locale-tolerant numeric parsing for statement values.
//!
//! Bank statements mix US (1,234.56), European (1.234,56) and Swiss
//! (1'234.56) separator conventions, often within the same document after
//! OCR. Parsing is best-effort: anything unparseable yields `None`, never
//! an error.

use once_cell::sync::Lazy;
use regex::Regex;

/// Currency symbols stripped before numeric parsing.
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₣', '₹'];

static CURRENCY_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{3}\b").unwrap());

/// Parse an amount string into a number.
///
/// Disambiguation rules:
/// - Both comma and period present: the right-most separator is the decimal
///   point, the other one is a thousands separator.
/// - Only commas: decimal separator iff exactly two digits follow the last
///   comma, otherwise thousands (e.g. "12,34" vs "1,234").
/// - Apostrophes are always thousands separators (Swiss convention).
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut s: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    // Parenthesized amounts are negative in some statement formats
    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = s[1..s.len() - 1].to_string();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.to_string();
    }
    s = s.trim_start_matches('+').to_string();

    // Apostrophes never carry decimal meaning
    s = s.replace('\'', "");

    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let has_comma = s.contains(',');
    let has_period = s.contains('.');

    let normalized = match (has_comma, has_period) {
        (true, true) => {
            let last_comma = s.rfind(',').unwrap();
            let last_period = s.rfind('.').unwrap();
            if last_comma > last_period {
                // European: periods are thousands, comma is decimal
                s.replace('.', "").replace(',', ".")
            } else {
                // US: commas are thousands
                s.replace(',', "")
            }
        }
        (true, false) => {
            let after_last = &s[s.rfind(',').unwrap() + 1..];
            if after_last.len() == 2 {
                let without_thousands = s.replacen(
                    ',',
                    "",
                    s.matches(',').count().saturating_sub(1),
                );
                without_thousands.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (false, true) => {
            // A single period reads as a US decimal point; repeated periods
            // are thousands separators unless the last group has two digits.
            if s.matches('.').count() > 1 {
                let after_last = &s[s.rfind('.').unwrap() + 1..];
                if after_last.len() == 2 {
                    let without_thousands = s.replacen(
                        '.',
                        "",
                        s.matches('.').count().saturating_sub(1),
                    );
                    without_thousands
                } else {
                    s.replace('.', "")
                }
            } else {
                s
            }
        }
        (false, false) => s,
    };

    normalized
        .parse::<f64>()
        .ok()
        .map(|v| if negative { -v } else { v })
        .filter(|v| v.is_finite())
}

/// Parse a percentage string ("12,5 %" / "12.5%").
///
/// Results outside `[0, 100]` are rejected.
pub fn parse_percentage(raw: &str) -> Option<f64> {
    let stripped = raw.replace('%', "");
    parse_amount(&stripped).filter(|p| (0.0..=100.0).contains(p))
}

/// Tolerant amount parsing that also strips embedded currency codes
/// ("USD 1'234.56", "1.234,56 EUR").
pub fn clean_currency_value(raw: &str) -> Option<f64> {
    let without_codes = CURRENCY_CODE.replace_all(raw, " ");
    parse_amount(&without_codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_format() {
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("1,234,567.89"), Some(1234567.89));
        assert_eq!(parse_amount("150.00"), Some(150.0));
    }

    #[test]
    fn test_european_format() {
        assert_eq!(parse_amount("1.234,56"), Some(1234.56));
        assert_eq!(parse_amount("1.234.567,89"), Some(1234567.89));
        assert_eq!(parse_amount("0,01"), Some(0.01));
    }

    #[test]
    fn test_swiss_format() {
        assert_eq!(parse_amount("1'234.56"), Some(1234.56));
        assert_eq!(parse_amount("2'895'000"), Some(2895000.0));
        assert_eq!(parse_amount("1'234,56"), Some(1234.56));
    }

    #[test]
    fn test_comma_only_disambiguation() {
        // Exactly two trailing digits: decimal
        assert_eq!(parse_amount("12,34"), Some(12.34));
        assert_eq!(parse_amount("1,234,56"), Some(1234.56));
        // Otherwise thousands
        assert_eq!(parse_amount("1,234"), Some(1234.0));
        assert_eq!(parse_amount("1,234,567"), Some(1234567.0));
    }

    #[test]
    fn test_currency_symbols_and_whitespace() {
        assert_eq!(parse_amount("$ 1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("€1.234,56"), Some(1234.56));
        assert_eq!(parse_amount(" 150.25 "), Some(150.25));
    }

    #[test]
    fn test_signs() {
        assert_eq!(parse_amount("-123,45"), Some(-123.45));
        assert_eq!(parse_amount("(1,234.56)"), Some(-1234.56));
        assert_eq!(parse_amount("+42"), Some(42.0));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("12a34"), None);
        assert_eq!(parse_amount("--5"), None);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(parse_percentage("12.5%"), Some(12.5));
        assert_eq!(parse_percentage("12,5 %"), Some(12.5));
        assert_eq!(parse_percentage("0%"), Some(0.0));
        assert_eq!(parse_percentage("100%"), Some(100.0));
        assert_eq!(parse_percentage("101%"), None);
        assert_eq!(parse_percentage("-5%"), None);
        assert_eq!(parse_percentage("n/a"), None);
    }

    #[test]
    fn test_clean_currency_value() {
        assert_eq!(clean_currency_value("USD 1'234.56"), Some(1234.56));
        assert_eq!(clean_currency_value("1.234,56 EUR"), Some(1234.56));
        assert_eq!(clean_currency_value("CHF -42.00"), Some(-42.0));
        assert_eq!(clean_currency_value("EUR"), None);
    }
}
