//! Securities extraction pipeline.
//!
//! Candidates come from two independent sources: classified tables and
//! free text. Both feed a merge keyed by ISIN, then type/currency
//! inference fills gaps and the reconciler derives, bound-checks,
//! cross-validates and orders the final list.
//!
//! Per-record problems never abort a run; the entry points always return
//! a (possibly empty) list.

pub mod infer;
pub mod reconcile;
pub mod tables;
pub mod text;

use std::collections::HashMap;

use crate::models::{DocumentContent, Security, SecurityType};
use reconcile::ReconcileConfig;

/// Result of one extraction run: the best-effort holdings list plus
/// diagnostics collected along the way.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub securities: Vec<Security>,
    pub warnings: Vec<String>,
}

/// Extract the normalized holdings list from one document's content.
pub fn extract_securities(content: &DocumentContent) -> Vec<Security> {
    extract_securities_with_report(content).securities
}

/// Extraction with diagnostics, using default reconciliation thresholds.
pub fn extract_securities_with_report(content: &DocumentContent) -> ExtractionResult {
    extract_securities_with_config(content, &ReconcileConfig::default())
}

/// Extraction with caller-supplied plausibility/correction thresholds.
pub fn extract_securities_with_config(
    content: &DocumentContent,
    config: &ReconcileConfig,
) -> ExtractionResult {
    let mut warnings = Vec::new();

    let mut candidates = tables::extract_from_tables(&content.tables, &mut warnings);
    candidates.extend(text::extract_from_text(&content.text, config, &mut warnings));

    let mut securities = merge_candidates(candidates);

    for sec in securities.iter_mut() {
        if sec.security_type == SecurityType::Unknown {
            sec.security_type = infer::type_from_name(&sec.name);
        }
    }

    reconcile::reconcile(&mut securities, content, config, &mut warnings);

    log::debug!(
        "extraction finished: {} securities, {} warnings",
        securities.len(),
        warnings.len()
    );
    ExtractionResult { securities, warnings }
}

/// Union candidates by identifier.
///
/// The first-seen record is the base; later duplicates only fill fields
/// the base is missing (or replace a synthetic placeholder name). Merging
/// a list with itself is a no-op.
pub fn merge_candidates(candidates: Vec<Security>) -> Vec<Security> {
    let mut merged: Vec<Security> = Vec::new();
    let mut index_by_isin: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        match index_by_isin.get(&candidate.isin) {
            Some(&i) => merge_into(&mut merged[i], candidate),
            None => {
                index_by_isin.insert(candidate.isin.clone(), merged.len());
                merged.push(candidate);
            }
        }
    }
    merged
}

fn merge_into(base: &mut Security, incoming: Security) {
    if base.has_placeholder_name()
        && !incoming.name.is_empty()
        && !incoming.has_placeholder_name()
    {
        base.name = incoming.name;
    }
    if base.security_type == SecurityType::Unknown {
        base.security_type = incoming.security_type;
    }
    if base.quantity.is_none() {
        base.quantity = incoming.quantity;
    }
    if base.price.is_none() {
        base.price = incoming.price;
    }
    if base.value.is_none() {
        base.value = incoming.value;
    }
    if base.percentage.is_none() {
        base.percentage = incoming.percentage;
    }
    if base.currency.is_none() {
        base.currency = incoming.currency;
    }
}
