//! ISIN validation and lookup.
//!
//! An ISIN is a 12-character identifier: two-letter country prefix, nine
//! alphanumeric characters and a numeric check digit. The check digit is
//! validated with the Luhn algorithm over a letter-to-digit transliteration
//! (A=10 .. Z=35).

use once_cell::sync::Lazy;
use regex::Regex;

/// Strict ISIN shape: the final character must be the numeric check digit.
static ISIN_STRICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]{9}[0-9]$").unwrap());

/// ISIN shape anywhere in a larger string (word-bounded).
static ISIN_ANYWHERE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2}[A-Z0-9]{9}[0-9]\b").unwrap());

/// Loose 12-character shape used as a table classification signal only.
static ISIN_SHAPE_LOOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2}[A-Z0-9]{10}\b").unwrap());

/// Validate an ISIN including its check digit.
pub fn validate(code: &str) -> bool {
    if !ISIN_STRICT.is_match(code) {
        return false;
    }

    // Transliterate letters to two digits each (A=10 .. Z=35)
    let mut digits: Vec<u32> = Vec::with_capacity(24);
    for c in code.chars() {
        if let Some(d) = c.to_digit(10) {
            digits.push(d);
        } else {
            let v = c as u32 - 'A' as u32 + 10;
            digits.push(v / 10);
            digits.push(v % 10);
        }
    }

    // Luhn: starting from the rightmost digit, double every second one
    let mut sum = 0;
    for (i, d) in digits.iter().rev().enumerate() {
        let mut d = *d;
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }

    sum % 10 == 0
}

/// Whether a cell/token looks like an ISIN (shape only, no checksum).
pub fn looks_like_isin(text: &str) -> bool {
    ISIN_SHAPE_LOOSE.is_match(text)
}

/// Find the first checksum-valid ISIN embedded in a string.
pub fn find_first(text: &str) -> Option<String> {
    ISIN_ANYWHERE
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|c| validate(c))
        .map(|c| c.to_string())
}

/// Find all checksum-valid ISINs with their byte offsets, deduplicated
/// (first occurrence wins).
pub fn find_all(text: &str) -> Vec<(String, usize)> {
    let mut seen = std::collections::HashSet::new();
    let mut found = Vec::new();
    for m in ISIN_ANYWHERE.find_iter(text) {
        let code = m.as_str();
        if validate(code) && seen.insert(code.to_string()) {
            found.push((code.to_string(), m.start()));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_isins() {
        assert!(validate("US0378331005")); // Apple
        assert!(validate("US5949181045")); // Microsoft
        assert!(validate("DE0005140008")); // Deutsche Bank
        assert!(validate("CH0038863350")); // Nestlé
        assert!(validate("GB00B03MLX29")); // Shell
        assert!(validate("IE00B4L5Y983")); // iShares Core MSCI World
        assert!(validate("LU0950674175"));
    }

    #[test]
    fn test_invalid_check_digit() {
        assert!(!validate("US0378331006"));
        assert!(!validate("US0378331000"));
        assert!(!validate("XX0000000000"));
    }

    #[test]
    fn test_invalid_shape() {
        assert!(!validate("US037833100")); // too short
        assert!(!validate("US03783310055")); // too long
        assert!(!validate("1S0378331005")); // digit in country code
        assert!(!validate("US037833100A")); // letter check digit
        assert!(!validate("us0378331005")); // lowercase
    }

    #[test]
    fn test_find_first() {
        assert_eq!(
            find_first("Position ISIN US0378331005 Apple"),
            Some("US0378331005".to_string())
        );
        // Checksum-invalid lookalike is skipped
        assert_eq!(find_first("US0378331006 then DE0005140008"),
            Some("DE0005140008".to_string()));
        assert_eq!(find_first("no identifier here"), None);
    }

    #[test]
    fn test_find_all_dedupes() {
        let text = "US0378331005 twice: US0378331005 and DE0005140008";
        let found = find_all(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, "US0378331005");
        assert_eq!(found[1].0, "DE0005140008");
    }

    #[test]
    fn test_no_match_inside_longer_token() {
        assert_eq!(find_first("XUS0378331005Y"), None);
    }
}
