//! Table classification and field extraction.
//!
//! Scanned statements rarely label their holdings tables consistently, so
//! classification combines several redundant signals: title keywords,
//! header keywords and raw ISIN-shaped cells. Field extraction resolves
//! header columns per semantic field (exact match first, then substring)
//! and falls back to scanning whole rows when the identifier column is
//! empty or missing.

use crate::extract::infer;
use crate::isin;
use crate::models::{DetectedTable, Security, SecurityType};
use crate::numeric;

/// Title keywords that mark a table as holdings-related.
const TITLE_KEYWORDS: &[&str] = &[
    "securities",
    "holding",
    "position",
    "investment",
    "portfolio",
    "asset",
    "bond",
    "stock",
    "equity",
    "fund",
];

const NAME_KEYWORDS: &[&str] = &["name", "security", "description", "instrument", "holding"];
const IDENTIFIER_KEYWORDS: &[&str] = &["isin", "cusip", "identifier", "id", "code", "symbol"];
const QUANTITY_KEYWORDS: &[&str] = &["quantity", "qty", "shares", "units", "nominal", "amount"];
const PRICE_KEYWORDS: &[&str] = &["price", "rate", "quote", "nav"];
const VALUE_KEYWORDS: &[&str] = &["market value", "value", "total", "worth", "balance"];
const PERCENTAGE_KEYWORDS: &[&str] = &["%", "percent", "weight", "allocation"];
const CURRENCY_KEYWORDS: &[&str] = &["currency", "ccy", "cur"];
const TYPE_KEYWORDS: &[&str] = &["type", "category", "class"];

/// Whether a detected table plausibly contains securities holdings.
pub fn is_securities_table(table: &DetectedTable) -> bool {
    if let Some(title) = &table.title {
        let title = title.to_lowercase();
        if TITLE_KEYWORDS.iter().any(|k| title.contains(k)) {
            return true;
        }
    }

    let headers: Vec<String> = table.headers.iter().map(|h| h.to_lowercase()).collect();
    let has_name = headers
        .iter()
        .any(|h| NAME_KEYWORDS.iter().any(|k| h.contains(k)));
    let has_identifier = headers
        .iter()
        .any(|h| IDENTIFIER_KEYWORDS.iter().any(|k| h.contains(k)));
    if has_name && has_identifier {
        return true;
    }

    table
        .rows
        .iter()
        .flatten()
        .any(|cell| isin::looks_like_isin(cell))
}

/// Resolve the column index for one semantic field: exact header match
/// first, then substring match.
fn resolve_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    for keyword in keywords {
        if let Some(i) = lowered.iter().position(|h| h == keyword) {
            return Some(i);
        }
    }
    for keyword in keywords {
        if let Some(i) = lowered.iter().position(|h| h.contains(keyword)) {
            return Some(i);
        }
    }
    None
}

/// Resolved column layout of one holdings table.
struct ColumnMap {
    name: Option<usize>,
    identifier: Option<usize>,
    quantity: Option<usize>,
    price: Option<usize>,
    value: Option<usize>,
    percentage: Option<usize>,
    currency: Option<usize>,
    security_type: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Self {
        Self {
            name: resolve_column(headers, NAME_KEYWORDS),
            identifier: resolve_column(headers, IDENTIFIER_KEYWORDS),
            quantity: resolve_column(headers, QUANTITY_KEYWORDS),
            price: resolve_column(headers, PRICE_KEYWORDS),
            value: resolve_column(headers, VALUE_KEYWORDS),
            percentage: resolve_column(headers, PERCENTAGE_KEYWORDS),
            currency: resolve_column(headers, CURRENCY_KEYWORDS),
            security_type: resolve_column(headers, TYPE_KEYWORDS),
        }
    }
}

fn cell<'a>(row: &'a [String], index: Option<usize>) -> Option<&'a str> {
    index
        .and_then(|i| row.get(i))
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
}

/// Extract candidate securities from all classified tables.
pub fn extract_from_tables(tables: &[DetectedTable], warnings: &mut Vec<String>) -> Vec<Security> {
    let mut candidates = Vec::new();

    for table in tables {
        if !is_securities_table(table) {
            continue;
        }
        let columns = ColumnMap::resolve(&table.headers);

        for row in &table.rows {
            match extract_row(row, &columns) {
                Some(security) => candidates.push(security),
                None => {
                    if !row.iter().all(|c| c.trim().is_empty()) {
                        warnings.push(format!(
                            "table row without checksum-valid identifier skipped: {:?}",
                            row
                        ));
                    }
                }
            }
        }
    }

    log::debug!("table extraction found {} candidates", candidates.len());
    candidates
}

/// Extract one candidate from a table row. Returns `None` when no
/// checksum-valid ISIN can be located in the row.
fn extract_row(row: &[String], columns: &ColumnMap) -> Option<Security> {
    // Resolved identifier column first, then a scan of the whole row
    let isin = cell(row, columns.identifier)
        .and_then(isin::find_first)
        .or_else(|| row.iter().find_map(|c| isin::find_first(c)))?;

    let mut security = Security::new(&isin);

    if let Some(name) = cell(row, columns.name) {
        // The identifier sometimes bleeds into the name cell on OCR tables
        let cleaned = name.replace(&isin, "");
        let cleaned = cleaned.trim().trim_matches(|c| c == ',' || c == '-');
        if cleaned.len() >= 2 {
            security.name = cleaned.to_string();
        }
    }

    security.quantity = cell(row, columns.quantity).and_then(numeric::parse_amount);
    security.price = cell(row, columns.price).and_then(numeric::clean_currency_value);
    security.value = cell(row, columns.value).and_then(numeric::clean_currency_value);
    security.percentage = cell(row, columns.percentage).and_then(numeric::parse_percentage);

    if let Some(code) = cell(row, columns.currency) {
        let code = code.to_uppercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            security.currency = Some(code);
        }
    }

    security.security_type = cell(row, columns.security_type)
        .map(SecurityType::from_str)
        .filter(|t| *t != SecurityType::Unknown)
        .unwrap_or_else(|| infer::type_from_name(&security.name));

    Some(security)
}
