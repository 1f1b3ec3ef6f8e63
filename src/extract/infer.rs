//! Fallback classification from security names and document-wide
//! currency signals.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::SecurityType;

/// Keyword lists per asset class, checked in order. More specific classes
/// come first so "Real Estate Fund" is real estate and "Gold ETF" is a
/// commodity vehicle rather than a generic fund.
const TYPE_KEYWORDS: &[(SecurityType, &[&str])] = &[
    (
        SecurityType::Cash,
        &["cash", "deposit", "money market", "liquidity", "current account"],
    ),
    (
        SecurityType::RealEstate,
        &["reit", "real estate", "property", "immobilien"],
    ),
    (
        SecurityType::Commodity,
        &["gold", "silver", "platinum", "palladium", "commodity", "crude oil"],
    ),
    (
        SecurityType::Structured,
        &["structured", "certificate", "autocall", "barrier", "zertifikat"],
    ),
    (
        SecurityType::Derivative,
        &["option", "warrant", "future", "swap", "forward"],
    ),
    (
        SecurityType::Fund,
        &["fund", "etf", "ucits", "sicav", "index", "trust", "fonds"],
    ),
    (
        SecurityType::Bond,
        &["bond", "treasury", "note", "notes", "debenture", "obligation", "anleihe"],
    ),
    (
        SecurityType::Equity,
        &[
            "inc", "corp", "corporation", "company", "ltd", "plc", " ag", " sa", " se",
            " nv", "shares", "stock", "aktien", "ord",
        ],
    ),
];

/// Infer the asset class from a security name.
pub fn type_from_name(name: &str) -> SecurityType {
    let lowered = format!(" {} ", name.to_lowercase());

    for (security_type, keywords) in TYPE_KEYWORDS {
        for keyword in *keywords {
            // Keywords with leading spaces are suffix-style tokens (" ag");
            // plain keywords match on word boundaries within the name.
            let hit = if keyword.starts_with(' ') {
                lowered.contains(&format!("{} ", keyword))
                    || lowered.trim_end().ends_with(keyword.trim_start())
                        && lowered.contains(keyword)
            } else {
                contains_word(&lowered, keyword)
            };
            if hit {
                return *security_type;
            }
        }
    }
    SecurityType::Unknown
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.split(|c: char| !c.is_alphanumeric()).any(|t| t == word)
        || (word.contains(' ') && haystack.contains(word))
}

/// Currency symbols and explicit keywords counted across a document.
const CURRENCY_SIGNALS: &[(&str, &str)] = &[
    ("USD", "USD"),
    ("$", "USD"),
    ("EUR", "EUR"),
    ("€", "EUR"),
    ("CHF", "CHF"),
    ("GBP", "GBP"),
    ("£", "GBP"),
    ("JPY", "JPY"),
    ("¥", "JPY"),
    ("CAD", "CAD"),
    ("AUD", "AUD"),
    ("SEK", "SEK"),
    ("NOK", "NOK"),
    ("DKK", "DKK"),
];

static CURRENCY_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").unwrap());

/// Infer the document's dominant currency.
///
/// An explicitly reported portfolio currency wins. Otherwise the most
/// frequent symbol/code across the text is used, defaulting to USD.
pub fn document_currency(text: &str, portfolio_currency: Option<&str>) -> String {
    if let Some(code) = portfolio_currency {
        let code = code.trim().to_uppercase();
        if CURRENCY_CODE.is_match(&code) {
            return code;
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (signal, code) in CURRENCY_SIGNALS {
        let count = text.matches(signal).count();
        if count > 0 && best.map(|(_, c)| count > c).unwrap_or(true) {
            best = Some((code, count));
        }
    }

    best.map(|(code, _)| code.to_string())
        .unwrap_or_else(|| "USD".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equity_names() {
        assert_eq!(type_from_name("Apple Inc."), SecurityType::Equity);
        assert_eq!(type_from_name("Siemens AG"), SecurityType::Equity);
        assert_eq!(type_from_name("Shell plc"), SecurityType::Equity);
    }

    #[test]
    fn test_bond_names() {
        assert_eq!(
            type_from_name("US Treasury 2.5% 2030"),
            SecurityType::Bond
        );
        assert_eq!(
            type_from_name("Corporate Bond 4.2% 2028"),
            SecurityType::Bond
        );
    }

    #[test]
    fn test_fund_names() {
        assert_eq!(
            type_from_name("iShares Core MSCI World UCITS ETF"),
            SecurityType::Fund
        );
        assert_eq!(type_from_name("Vanguard S&P 500 Index Fund"), SecurityType::Fund);
    }

    #[test]
    fn test_specific_class_beats_generic() {
        assert_eq!(type_from_name("Gold ETF"), SecurityType::Commodity);
        assert_eq!(
            type_from_name("Real Estate Investment Trust"),
            SecurityType::RealEstate
        );
        assert_eq!(
            type_from_name("Barrier Reverse Convertible Certificate"),
            SecurityType::Structured
        );
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(type_from_name("XYZZY"), SecurityType::Unknown);
        assert_eq!(type_from_name(""), SecurityType::Unknown);
    }

    #[test]
    fn test_reported_portfolio_currency_wins() {
        assert_eq!(document_currency("lots of $ $ $", Some("chf")), "CHF");
        assert_eq!(document_currency("", Some("EURO")), "USD");
    }

    #[test]
    fn test_dominant_symbol() {
        assert_eq!(document_currency("€ 100 € 200 $ 300", None), "EUR");
        assert_eq!(document_currency("CHF 1'000 CHF 2'000", None), "CHF");
    }

    #[test]
    fn test_default_usd() {
        assert_eq!(document_currency("no signals here", None), "USD");
    }
}
