//! Validation and reconciliation of merged candidates.
//!
//! A deterministic single pass: derive missing fields, null implausible
//! values, backfill currency, cross-check against the reported portfolio
//! total with optional scale correction, backfill percentages and order
//! the final list. Per-record problems never abort the run.

use crate::extract::infer;
use crate::models::{DocumentContent, Security};

/// Plausibility bounds and scale-correction thresholds.
///
/// The correction thresholds are empirical values tuned on real statement
/// corpora; they are configuration rather than constants so stricter or
/// looser profiles can be substituted without code changes.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Prices above this are treated as OCR/locale artifacts and nulled.
    pub max_price: f64,
    /// Position values above this are nulled.
    pub max_value: f64,
    /// Quantities must lie in `(0, max_quantity)`.
    pub max_quantity: f64,
    /// Minimum number of valued securities before the total cross-check runs.
    pub min_valued_count: usize,
    /// Minimum share of the list that must carry values for the cross-check.
    pub min_valued_share: f64,
    /// Relative difference beyond which the sum/total mismatch is reported.
    pub mismatch_threshold: f64,
    /// Valued securities required before scale correction is attempted.
    pub scaling_min_count: usize,
    /// Relative difference required before scale correction is attempted.
    pub scaling_threshold: f64,
    /// Accepted scaling factor range (exclusive bounds).
    pub scaling_factor_min: f64,
    pub scaling_factor_max: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_price: 10_000.0,
            max_value: 100_000_000.0,
            max_quantity: 1_000_000_000.0,
            min_valued_count: 3,
            min_valued_share: 0.3,
            mismatch_threshold: 1.0,
            scaling_min_count: 5,
            scaling_threshold: 2.0,
            scaling_factor_min: 0.001,
            scaling_factor_max: 1_000.0,
        }
    }
}

/// Run the full reconciliation pipeline in place.
pub fn reconcile(
    securities: &mut Vec<Security>,
    content: &DocumentContent,
    config: &ReconcileConfig,
    warnings: &mut Vec<String>,
) {
    derive_missing_fields(securities);
    apply_bounds(securities, config, warnings);
    backfill_currency(securities, content);
    correct_scale(securities, content, config, warnings);
    backfill_percentages(securities);
    order(securities);
}

/// Fill any one of {price, quantity, value} from the other two.
fn derive_missing_fields(securities: &mut [Security]) {
    for sec in securities.iter_mut() {
        match (sec.price, sec.quantity, sec.value) {
            (Some(price), Some(quantity), None) => {
                sec.value = Some(price * quantity);
            }
            (Some(price), None, Some(value)) if price > 0.0 => {
                sec.quantity = Some(value / price);
            }
            (None, Some(quantity), Some(value)) if quantity > 0.0 => {
                sec.price = Some(value / quantity);
            }
            _ => {}
        }
    }
}

/// Null out-of-range numeric fields; the record itself stays.
fn apply_bounds(securities: &mut [Security], config: &ReconcileConfig, warnings: &mut Vec<String>) {
    for sec in securities.iter_mut() {
        if let Some(price) = sec.price {
            if price <= 0.0 || price > config.max_price {
                warnings.push(format!("{}: implausible price {} nulled", sec.isin, price));
                sec.price = None;
            }
        }
        if let Some(value) = sec.value {
            if value <= 0.0 || value > config.max_value {
                warnings.push(format!("{}: implausible value {} nulled", sec.isin, value));
                sec.value = None;
            }
        }
        if let Some(quantity) = sec.quantity {
            if quantity <= 0.0 || quantity >= config.max_quantity {
                warnings.push(format!(
                    "{}: implausible quantity {} nulled",
                    sec.isin, quantity
                ));
                sec.quantity = None;
            }
        }
        if let Some(percentage) = sec.percentage {
            if !(0.0..=100.0).contains(&percentage) {
                sec.percentage = None;
            }
        }
    }
}

/// Infer missing currencies from document-wide signals.
fn backfill_currency(securities: &mut [Security], content: &DocumentContent) {
    if securities.iter().all(|s| s.currency.is_some()) {
        return;
    }
    let document_currency =
        infer::document_currency(&content.text, content.portfolio_currency.as_deref());
    for sec in securities.iter_mut() {
        if sec.currency.is_none() {
            sec.currency = Some(document_currency.clone());
        }
    }
}

/// Cross-check the value sum against the reported portfolio total and
/// correct systemic unit mismatches (e.g. thousands vs. units).
///
/// The relative difference is measured against the smaller of the two
/// aggregates so uniform under- and over-scaling trigger symmetrically.
fn correct_scale(
    securities: &mut [Security],
    content: &DocumentContent,
    config: &ReconcileConfig,
    warnings: &mut Vec<String>,
) {
    let Some(total) = content.portfolio_total_value.filter(|t| *t > 0.0) else {
        return;
    };
    if securities.is_empty() {
        return;
    }

    let valued: Vec<f64> = securities.iter().filter_map(|s| s.value).collect();
    let valued_share = valued.len() as f64 / securities.len() as f64;
    if valued.len() < config.min_valued_count || valued_share < config.min_valued_share {
        return;
    }

    let sum: f64 = valued.iter().sum();
    if sum <= 0.0 {
        return;
    }

    let relative_diff = (sum - total).abs() / sum.min(total);
    if relative_diff <= config.mismatch_threshold {
        return;
    }
    warnings.push(format!(
        "value sum {:.2} differs from reported total {:.2} by {:.0}%",
        sum,
        total,
        relative_diff * 100.0
    ));

    if valued.len() < config.scaling_min_count || relative_diff <= config.scaling_threshold {
        return;
    }

    let factor = total / sum;
    if factor <= config.scaling_factor_min || factor >= config.scaling_factor_max {
        warnings.push(format!("scaling factor {:.4} out of range, not applied", factor));
        return;
    }

    log::debug!("applying scale correction factor {:.4}", factor);
    for sec in securities.iter_mut() {
        if let Some(value) = sec.value {
            let scaled = value * factor;
            sec.value = Some(scaled);
            if let Some(quantity) = sec.quantity.filter(|q| *q > 0.0) {
                sec.price = Some(scaled / quantity);
            }
        }
    }
    warnings.push(format!("scale correction {:.4} applied", factor));
}

/// Fill missing percentages proportionally to the known value sum.
fn backfill_percentages(securities: &mut [Security]) {
    let sum: f64 = securities.iter().filter_map(|s| s.value).sum();
    if sum <= 0.0 {
        return;
    }
    for sec in securities.iter_mut() {
        if sec.percentage.is_none() {
            if let Some(value) = sec.value {
                sec.percentage = Some(value / sum * 100.0);
            }
        }
    }
}

/// Descending by value with nulls last; name breaks ties.
fn order(securities: &mut [Security]) {
    securities.sort_by(|a, b| match (a.value, b.value) {
        (Some(va), Some(vb)) => vb
            .partial_cmp(&va)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
}
