//! Market data enrichment boundary.
//!
//! Optional collaborator that attaches live prices to extracted holdings.
//! Extraction itself never depends on this module; enrichment failures are
//! logged and the unenriched list is kept.

pub mod yahoo;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Security;

/// Errors from quote providers.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider error for {symbol}: {message}")]
    Provider { symbol: String, message: String },
    #[error("no quote found for {symbol}")]
    NotFound { symbol: String },
}

/// Latest quote for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    pub symbol: String,
    pub price: f64,
    pub currency: Option<String>,
    pub name: Option<String>,
}

/// Supported quote providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderType {
    Yahoo,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yahoo => "YAHOO",
        }
    }
}

/// Fetch the latest quote for one identifier via the given provider.
pub async fn fetch_latest_quote(
    provider: ProviderType,
    isin: &str,
) -> Result<MarketQuote, MarketDataError> {
    match provider {
        ProviderType::Yahoo => yahoo::fetch_quote_by_isin(isin).await,
    }
}

/// Attach live prices to extracted securities in place.
///
/// Each security is looked up by ISIN; a found quote overwrites `price`
/// and recomputes `value` where the quantity is known. Per-security
/// failures are logged and skipped, so a partially enriched list is the
/// normal outcome on flaky networks.
pub async fn update_securities_with_market_prices(
    securities: &mut [Security],
) -> anyhow::Result<()> {
    for sec in securities.iter_mut() {
        match fetch_latest_quote(ProviderType::Yahoo, &sec.isin).await {
            Ok(quote) => {
                log::debug!("market price for {}: {}", sec.isin, quote.price);
                sec.price = Some(quote.price);
                if let Some(quantity) = sec.quantity {
                    sec.value = Some(quantity * quote.price);
                }
                if sec.currency.is_none() {
                    sec.currency = quote.currency;
                }
            }
            Err(e) => {
                log::warn!("market data lookup failed for {}: {}", sec.isin, e);
            }
        }
    }
    Ok(())
}
