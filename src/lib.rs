//! Securities extraction and reconciliation engine.
//!
//! Turns pre-extracted statement content (OCR text plus detected tables)
//! into a normalized list of securities holdings. The pipeline:
//!
//! 1. Classify tables and extract per-row candidates
//! 2. Scan free text for ISINs and recover fields via context windows
//! 3. Merge candidates by identifier
//! 4. Infer missing types/currencies
//! 5. Derive, bound-check, cross-validate against the reported portfolio
//!    total and order the result
//!
//! The engine is pure and stateless: no I/O, no persistence, no cross-call
//! state. The only async boundary is optional market data enrichment.
//!
//! ```
//! use holdings_extract::{extract_securities, DocumentContent};
//!
//! let content: DocumentContent = serde_json::from_str(
//!     r#"{"text": "Apple Inc. (US0378331005)\nQuantity: 100"}"#,
//! ).unwrap();
//! let securities = extract_securities(&content);
//! assert_eq!(securities[0].isin, "US0378331005");
//! ```

pub mod extract;
pub mod isin;
pub mod marketdata;
pub mod models;
pub mod numeric;

pub use extract::reconcile::ReconcileConfig;
pub use extract::{extract_securities, extract_securities_with_report, ExtractionResult};
pub use models::{DetectedTable, DocumentContent, Security, SecurityType};

/// Extract securities from a JSON-encoded `DocumentContent`.
///
/// Structurally invalid input yields an empty list rather than an error,
/// preserving the "always returns a list" contract for untyped callers.
pub fn extract_securities_from_json(json: &str) -> Vec<Security> {
    match serde_json::from_str::<DocumentContent>(json) {
        Ok(content) => extract_securities(&content),
        Err(e) => {
            log::warn!("malformed document content, returning empty list: {}", e);
            Vec::new()
        }
    }
}

/// Extract securities and optionally enrich them with live market prices.
///
/// Enrichment failures never fail the call; the unenriched extraction
/// result is returned instead.
pub async fn extract_securities_with_market_data(
    content: &DocumentContent,
    include_market_data: bool,
) -> Vec<Security> {
    let mut securities = extract_securities(content);

    if include_market_data && !securities.is_empty() {
        if let Err(e) = marketdata::update_securities_with_market_prices(&mut securities).await {
            log::warn!("market data enrichment failed, returning unenriched list: {}", e);
        }
    }

    securities
}
