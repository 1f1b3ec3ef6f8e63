//! Data model for the extraction engine.
//!
//! `DocumentContent` is the immutable input handed over by the upstream
//! ingestion pipeline (OCR text plus detected tables). `Security` is the
//! normalized output record.

use serde::{Deserialize, Serialize};

/// Pre-extracted content of one financial statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tables: Vec<DetectedTable>,
    /// Reported aggregate holdings value, used as a reconciliation cross-check.
    #[serde(default)]
    pub portfolio_total_value: Option<f64>,
    #[serde(default)]
    pub portfolio_currency: Option<String>,
}

/// One table detected by the upstream layout analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedTable {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

/// A normalized securities holding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    pub isin: String,
    pub name: String,
    pub security_type: SecurityType,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub value: Option<f64>,
    /// Share of the portfolio, constrained to `[0, 100]`.
    pub percentage: Option<f64>,
    pub currency: Option<String>,
}

impl Security {
    /// New record with only the identifier known. The name starts as a
    /// synthetic placeholder and may be replaced by any later source.
    pub fn new(isin: &str) -> Self {
        Self {
            isin: isin.to_string(),
            name: placeholder_name(isin),
            security_type: SecurityType::Unknown,
            quantity: None,
            price: None,
            value: None,
            percentage: None,
            currency: None,
        }
    }

    pub fn has_placeholder_name(&self) -> bool {
        self.name.is_empty() || self.name == placeholder_name(&self.isin)
    }
}

/// Fallback name when no usable name was found near the identifier.
pub fn placeholder_name(isin: &str) -> String {
    format!("Security {}", isin)
}

/// Asset class of a holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityType {
    Equity,
    Bond,
    Fund,
    Derivative,
    Cash,
    RealEstate,
    Commodity,
    Structured,
    Unknown,
}

impl SecurityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::Bond => "bond",
            Self::Fund => "fund",
            Self::Derivative => "derivative",
            Self::Cash => "cash",
            Self::RealEstate => "real_estate",
            Self::Commodity => "commodity",
            Self::Structured => "structured",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "equity" | "stock" | "share" | "shares" | "aktie" => Self::Equity,
            "bond" | "note" | "anleihe" | "obligation" => Self::Bond,
            "fund" | "etf" | "fonds" => Self::Fund,
            "derivative" | "option" | "warrant" | "future" => Self::Derivative,
            "cash" | "liquidity" => Self::Cash,
            "real_estate" | "real estate" | "reit" => Self::RealEstate,
            "commodity" => Self::Commodity,
            "structured" | "certificate" | "zertifikat" => Self::Structured,
            _ => Self::Unknown,
        }
    }
}
