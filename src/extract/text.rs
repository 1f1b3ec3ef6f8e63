//! Free-text entity extraction.
//!
//! Statements that defeat table detection still carry holdings in running
//! text. Every checksum-valid ISIN found in the document anchors a
//! context-window search: names sit close to the identifier (±300 chars),
//! while quantities, prices and values may be on adjacent lines (±500
//! chars). Each field is resolved by an ordered pattern list evaluated
//! first-match-wins, with plausibility filters on the parsed numbers.
//!
//! The closest-line name fallback is best-effort by nature: it picks the
//! nearest plausible line, not a guaranteed-correct one.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::infer;
use crate::extract::reconcile::ReconcileConfig;
use crate::isin;
use crate::models::{Security, SecurityType};
use crate::numeric;

/// Window half-widths around an identifier, in characters.
const NAME_WINDOW: usize = 300;
const NUMERIC_WINDOW: usize = 500;

/// Ordered label patterns per numeric field. `$1` must capture the raw
/// numeric string.
static QUANTITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\b(?:quantity|qty|shares|units|nominal|holdings?|st(?:ü|u)ck|anzahl)\s*[:=]?\s*([0-9][0-9.,']*)",
        r"(?i)([0-9][0-9.,']*)\s*(?:shares|units|stk\.?|st(?:ü|u)ck)",
    ])
});

static PRICE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\b(?:price|rate|quote|nav|kurs)\s*(?:per\s+(?:share|unit))?\s*[:=]?\s*(?:[A-Z]{3}\s*)?([0-9][0-9.,']*)",
        r"(?i)@\s*([0-9][0-9.,']*)",
    ])
});

static VALUE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\b(?:market\s*value|valuation|value|total|amount|balance|worth|wert|betrag)\s*[:=]?\s*(?:[A-Z]{3}\s*)?([0-9][0-9.,']*)",
        r"(?:USD|EUR|CHF|GBP|JPY|CAD|AUD)\s*([0-9][0-9.,']*)",
    ])
});

static PERCENTAGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"([0-9][0-9.,]*)\s*%",
        r"(?i)(?:weight|allocation|percent)\s*[:=]?\s*([0-9][0-9.,]*)",
    ])
});

/// Anchored name patterns. Each matches any ISIN-shaped token; a hit only
/// counts when the captured token equals the identifier being resolved.
static NAME_BEFORE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][^\n\(]{2,99}?)[\s,]*\(?\s*(?:ISIN\s*[:\s]\s*)?([A-Z]{2}[A-Z0-9]{9}[0-9])")
        .unwrap()
});

static NAME_IN_PARENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]{2}[A-Z0-9]{9}[0-9])\s*\(\s*([^\n)]{3,100})\)").unwrap());

static NAME_LABELED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)security\s*[:\-]\s*([^\n]{3,100})").unwrap());

static NAME_AFTER_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z]{2}[A-Z0-9]{9}[0-9])\s*[-–:,]?\s+([A-Z][^\n]{2,99})").unwrap()
});

static CURRENCY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(USD|EUR|CHF|GBP|JPY|CAD|AUD|SEK|NOK|DKK|HKD|SGD)\b").unwrap());

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Header-style tokens that disqualify a line as a security name.
const HEADER_TOKENS: &[&str] = &[
    "isin", "name", "security", "description", "quantity", "price", "value", "total",
    "currency", "type", "percentage", "portfolio", "holdings", "position", "positions",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static field pattern must compile"))
        .collect()
}

/// Extract candidate securities from free text. Pattern matches whose
/// parsed numbers fall outside the config bounds are discarded here, so
/// the caller's thresholds apply at extraction time, not just during
/// reconciliation.
pub fn extract_from_text(
    text: &str,
    config: &ReconcileConfig,
    warnings: &mut Vec<String>,
) -> Vec<Security> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::new();

    for (code, offset) in isin::find_all(text) {
        let mut security = Security::new(&code);

        let name_window = window(text, offset, offset + code.len(), NAME_WINDOW);
        let numeric_window = window(text, offset, offset + code.len(), NUMERIC_WINDOW);

        match resolve_name(text, name_window, &code, offset) {
            Some(name) => security.name = name,
            None => warnings.push(format!("no usable name found near {}", code)),
        }

        security.quantity = first_numeric_match(numeric_window, &QUANTITY_PATTERNS, |q| {
            q > 0.0 && q < config.max_quantity
        });
        security.price = first_numeric_match(numeric_window, &PRICE_PATTERNS, |p| {
            p > 0.0 && p <= config.max_price
        });
        security.value = first_numeric_match(numeric_window, &VALUE_PATTERNS, |v| {
            v > 0.0 && v <= config.max_value
        });
        // No direct value pattern: derive it when both factors are present
        if security.value.is_none() {
            if let (Some(price), Some(quantity)) = (security.price, security.quantity) {
                let derived = price * quantity;
                if derived <= config.max_value {
                    security.value = Some(derived);
                }
            }
        }

        security.percentage =
            first_numeric_match(numeric_window, &PERCENTAGE_PATTERNS, |p| (0.0..=100.0).contains(&p));

        security.currency = CURRENCY_PATTERN
            .captures(numeric_window)
            .map(|c| c[1].to_string());

        security.security_type = infer::type_from_name(&security.name);
        if security.security_type == SecurityType::Unknown {
            security.security_type = type_from_window(numeric_window);
        }

        candidates.push(security);
    }

    log::debug!("text extraction found {} candidates", candidates.len());
    candidates
}

/// Bounded substring around `[start, end)`, clamped to char boundaries.
fn window(text: &str, start: usize, end: usize, pad: usize) -> &str {
    let mut from = start.saturating_sub(pad);
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + pad).min(text.len());
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }
    &text[from..to]
}

/// First pattern whose captured number passes the plausibility filter.
fn first_numeric_match(
    window: &str,
    patterns: &[Regex],
    plausible: impl Fn(f64) -> bool,
) -> Option<f64> {
    for pattern in patterns {
        for captures in pattern.captures_iter(window) {
            if let Some(parsed) = numeric::parse_amount(&captures[1]) {
                if plausible(parsed) {
                    return Some(parsed);
                }
            }
        }
    }
    None
}

/// Resolve the security name for one identifier.
///
/// Tries the ordered pattern list first (name before the identifier, name
/// in parentheses, explicitly labeled name, name after the identifier),
/// then falls back to the nearest plausible text line.
fn resolve_name(text: &str, name_window: &str, code: &str, offset: usize) -> Option<String> {
    // (pattern, identifier capture group, name capture group); the labeled
    // pattern carries no identifier of its own.
    let anchored: [(&Regex, Option<usize>, usize); 4] = [
        // "Apple Inc. (US0378331005)" / "Apple Inc., ISIN US0378331005"
        (&NAME_BEFORE_CODE, Some(2), 1),
        // "US0378331005 (Apple Inc.)"
        (&NAME_IN_PARENS, Some(1), 2),
        // "Security: Apple Inc."
        (&NAME_LABELED, None, 1),
        // "US0378331005 - Apple Inc."
        (&NAME_AFTER_CODE, Some(1), 2),
    ];

    for (pattern, code_group, name_group) in anchored {
        for captures in pattern.captures_iter(name_window) {
            if code_group.is_some_and(|g| &captures[g] != code) {
                continue;
            }
            if let Some(name) = clean_name_candidate(&captures[name_group]) {
                return Some(name);
            }
        }
    }

    closest_plausible_line(text, offset)
}

/// Trim and validate a captured name candidate.
fn clean_name_candidate(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .trim_matches(|c: char| c == ',' || c == '-' || c == ':' || c == '(' || c == ')')
        .trim();

    let len = cleaned.chars().count();
    if !(3..=100).contains(&len) {
        return None;
    }
    if !cleaned
        .chars()
        .next()
        .map(|c| c.is_uppercase())
        .unwrap_or(false)
    {
        return None;
    }
    if DIGIT_RUN.find_iter(cleaned).count() >= 3 {
        return None;
    }
    if isin::find_first(cleaned).is_some() {
        return None;
    }
    let lowered = cleaned.to_lowercase();
    if HEADER_TOKENS.contains(&lowered.as_str()) {
        return None;
    }
    Some(cleaned.to_string())
}

/// Nearest plausible line fallback, chosen by line distance from the
/// identifier's own line. Lines containing any identifier are skipped.
fn closest_plausible_line(text: &str, offset: usize) -> Option<String> {
    let mut line_of_offset = 0;
    let mut line_starts = vec![0usize];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            line_starts.push(i + 1);
        }
    }
    for (index, start) in line_starts.iter().enumerate() {
        if *start <= offset {
            line_of_offset = index;
        }
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut best: Option<(usize, String)> = None;

    for (index, line) in lines.iter().enumerate() {
        if isin::find_first(line).is_some() {
            continue;
        }
        let Some(candidate) = clean_name_candidate(line) else {
            continue;
        };
        let distance = index.abs_diff(line_of_offset);
        if best.as_ref().map(|(d, _)| distance < *d).unwrap_or(true) {
            best = Some((distance, candidate));
        }
    }

    best.map(|(_, name)| name)
}

/// Asset-class keywords appearing near the identifier rather than in the
/// name itself ("Type: Bond", standalone "Equity").
fn type_from_window(window: &str) -> SecurityType {
    let lowered = window.to_lowercase();
    for keyword in [
        "bond", "equity", "stock", "fund", "etf", "option", "warrant", "cash",
        "commodity", "certificate",
    ] {
        if lowered
            .split(|c: char| !c.is_alphanumeric())
            .any(|t| t == keyword)
        {
            return SecurityType::from_str(keyword);
        }
    }
    SecurityType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_identifier_extracted_once() {
        let text = "Holdings overview\nApple Inc. (US0378331005)\n1000 shares at USD 150.00";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].isin, "US0378331005");
    }

    #[test]
    fn test_checksum_invalid_lookalike_never_emitted() {
        let text = "Fake position US0378331006 listed here";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert!(found.is_empty());
    }

    #[test]
    fn test_name_before_identifier() {
        let text = "Microsoft Corporation, ISIN US5949181045, held since 2019";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert_eq!(found[0].name, "Microsoft Corporation");
    }

    #[test]
    fn test_name_in_parentheses() {
        let text = "Position US5949181045 (Microsoft Corporation) unchanged";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert_eq!(found[0].name, "Microsoft Corporation");
    }

    #[test]
    fn test_labeled_name() {
        let text = "ISIN: US5949181045\nSecurity: Microsoft Corporation\nQuantity: 10";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert_eq!(found[0].name, "Microsoft Corporation");
        assert_eq!(found[0].quantity, Some(10.0));
    }

    #[test]
    fn test_name_on_preceding_line() {
        let text = "portfolio\n123 456 789 000\nNestlé SA\nCH0038863350\nquantity";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        // Header-like and number-heavy lines are skipped
        assert_eq!(found[0].name, "Nestlé SA");
    }

    #[test]
    fn test_closest_line_fallback() {
        // No anchored pattern applies: the only uppercase line sits two
        // lines above the identifier behind a lowercase summary line.
        let text = "Zurich Branch Custody\n\ntotal position summary\nCH0038863350 4,500 units\ntotal value below";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert_eq!(found[0].name, "Zurich Branch Custody");
    }

    #[test]
    fn test_numeric_fields_from_window() {
        let text = "Apple Inc. (US0378331005)\nQuantity: 1'000\nPrice: USD 150.25\nMarket value: USD 150'250.00\nWeight: 12.5%";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        let sec = &found[0];
        assert_eq!(sec.quantity, Some(1000.0));
        assert_eq!(sec.price, Some(150.25));
        assert_eq!(sec.value, Some(150250.0));
        assert_eq!(sec.percentage, Some(12.5));
        assert_eq!(sec.currency, Some("USD".to_string()));
    }

    #[test]
    fn test_value_derived_from_price_and_quantity() {
        let text = "Apple Inc. (US0378331005)\nQuantity: 100\nPrice: 150.00";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert_eq!(found[0].value, Some(15000.0));
    }

    #[test]
    fn test_implausible_numbers_filtered() {
        // 50,000,000 exceeds the price bound; the pattern match is discarded
        let text = "Apple Inc. (US0378331005)\nPrice: 50,000,000";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert_eq!(found[0].price, None);
    }

    #[test]
    fn test_custom_price_bound_applies_at_extraction() {
        let text = "Apple Inc. (US0378331005)\nPrice: 50,000";

        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert_eq!(found[0].price, None);

        let loosened = ReconcileConfig {
            max_price: 100_000.0,
            ..Default::default()
        };
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &loosened, &mut warnings);
        assert_eq!(found[0].price, Some(50000.0));
    }

    #[test]
    fn test_type_from_window_when_name_is_opaque() {
        let text = "Xq Holding\nUS88160R1014\nType: Bond\nnominal 10";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert_eq!(found[0].security_type, SecurityType::Bond);
    }

    #[test]
    fn test_duplicate_identifier_reported_once() {
        let text = "US0378331005 mentioned here and US0378331005 there";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_empty_text() {
        let mut warnings = Vec::new();
        assert!(extract_from_text("", &ReconcileConfig::default(), &mut warnings).is_empty());
    }

    #[test]
    fn test_window_respects_char_boundaries() {
        let text = "ééééééé US0378331005 ééééééé";
        let mut warnings = Vec::new();
        let found = extract_from_text(text, &ReconcileConfig::default(), &mut warnings);
        assert_eq!(found.len(), 1);
    }
}
