//! Yahoo Finance quote lookup.
//!
//! Two-step resolution: the search endpoint maps an ISIN to a ticker
//! symbol, then the chart endpoint delivers the latest close.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use super::{MarketDataError, MarketQuote};

const SEARCH_URL: &str = "https://query1.finance.yahoo.com/v1/finance/search";
const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// HTTP client with a browser User-Agent (Yahoo rejects the default one).
fn create_client() -> Result<reqwest::Client, MarketDataError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"),
    );

    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

/// Resolve an ISIN to a Yahoo ticker symbol.
pub async fn resolve_symbol(isin: &str) -> Result<String, MarketDataError> {
    let url = format!(
        "{}?q={}&quotesCount=1&newsCount=0",
        SEARCH_URL,
        urlencoding::encode(isin)
    );
    log::debug!("resolving Yahoo symbol for {} from {}", isin, url);

    let client = create_client()?;
    let response = client.get(&url).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!("Yahoo search error for {}: {} - {}", isin, status, body);
        return Err(MarketDataError::Provider {
            symbol: isin.to_string(),
            message: format!("HTTP {}: {}", status, body),
        });
    }

    let data: serde_json::Value = response.json().await?;
    data.get("quotes")
        .and_then(|q| q.as_array())
        .and_then(|q| q.first())
        .and_then(|q| q.get("symbol"))
        .and_then(|s| s.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| MarketDataError::NotFound {
            symbol: isin.to_string(),
        })
}

/// Fetch the latest quote for a ticker symbol.
pub async fn fetch_quote(symbol: &str) -> Result<MarketQuote, MarketDataError> {
    let url = format!(
        "{}/{}?interval=1d&range=1d",
        CHART_URL,
        urlencoding::encode(symbol)
    );
    log::debug!("fetching Yahoo quote for {} from {}", symbol, url);

    let client = create_client()?;
    let response = client.get(&url).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!("Yahoo API error for {}: {} - {}", symbol, status, body);
        return Err(MarketDataError::Provider {
            symbol: symbol.to_string(),
            message: format!("HTTP {}: {}", status, body),
        });
    }

    let data: serde_json::Value = response.json().await?;

    // Yahoo reports errors inside a 200 response
    if let Some(error) = data
        .get("chart")
        .and_then(|c| c.get("error"))
        .filter(|e| !e.is_null())
    {
        let code = error.get("code").and_then(|c| c.as_str()).unwrap_or("unknown");
        let desc = error
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("no description");
        log::error!("Yahoo API returned error for {}: {} - {}", symbol, code, desc);
        return Err(MarketDataError::Provider {
            symbol: symbol.to_string(),
            message: format!("{}: {}", code, desc),
        });
    }

    parse_latest_quote(symbol, &data)
}

/// Resolve an ISIN and fetch its latest quote in one call.
pub async fn fetch_quote_by_isin(isin: &str) -> Result<MarketQuote, MarketDataError> {
    let symbol = resolve_symbol(isin).await?;
    fetch_quote(&symbol).await
}

fn parse_latest_quote(
    symbol: &str,
    data: &serde_json::Value,
) -> Result<MarketQuote, MarketDataError> {
    let meta = data
        .get("chart")
        .and_then(|c| c.get("result"))
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .and_then(|r| r.get("meta"))
        .ok_or_else(|| MarketDataError::NotFound {
            symbol: symbol.to_string(),
        })?;

    let price = meta
        .get("regularMarketPrice")
        .and_then(|p| p.as_f64())
        .or_else(|| meta.get("previousClose").and_then(|p| p.as_f64()))
        .ok_or_else(|| MarketDataError::NotFound {
            symbol: symbol.to_string(),
        })?;

    Ok(MarketQuote {
        symbol: symbol.to_string(),
        price,
        currency: meta
            .get("currency")
            .and_then(|c| c.as_str())
            .map(|c| c.to_string()),
        name: meta
            .get("shortName")
            .and_then(|n| n.as_str())
            .map(|n| n.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_latest_quote() {
        let data = serde_json::json!({
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 150.25,
                        "currency": "USD",
                        "shortName": "Apple Inc."
                    }
                }],
                "error": null
            }
        });
        let quote = parse_latest_quote("AAPL", &data).unwrap();
        assert_eq!(quote.price, 150.25);
        assert_eq!(quote.currency, Some("USD".to_string()));
        assert_eq!(quote.name, Some("Apple Inc.".to_string()));
    }

    #[test]
    fn test_parse_falls_back_to_previous_close() {
        let data = serde_json::json!({
            "chart": { "result": [{ "meta": { "previousClose": 99.5 } }] }
        });
        let quote = parse_latest_quote("AAPL", &data).unwrap();
        assert_eq!(quote.price, 99.5);
        assert_eq!(quote.currency, None);
    }

    #[test]
    fn test_parse_missing_result() {
        let data = serde_json::json!({ "chart": { "result": [] } });
        assert!(parse_latest_quote("AAPL", &data).is_err());
    }
}
