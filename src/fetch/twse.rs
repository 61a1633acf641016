use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::time::{sleep, Duration};

use crate::error::{AppError, Context};

use super::{FetchResult, QuoteSource, SourceQuote};

pub const TWSE_ENDPOINT: &str = "https://mis.twse.com.tw/stock/api/getStockInfo.jsp";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
struct StockInfoResponse {
    #[serde(rename = "msgArray", default)]
    msg_array: Vec<StockInfoRow>,
}

#[derive(Debug, Deserialize)]
struct StockInfoRow {
    #[serde(rename = "c")]
    code: Option<String>,
    #[serde(rename = "n")]
    name: Option<String>,
    /// Last trade price, `-` when nothing traded in the current interval.
    #[serde(rename = "z")]
    last: Option<String>,
    /// Best bids joined by `_`.
    #[serde(rename = "b")]
    bids: Option<String>,
    /// Accumulated volume in lots.
    #[serde(rename = "v")]
    volume: Option<String>,
    #[serde(rename = "y")]
    prev_close: Option<String>,
}

/// Real-time quotes from the Taiwan Stock Exchange MIS endpoint.
pub struct TwseQuoteSource {
    client: Client,
    endpoint: String,
}

impl TwseQuoteSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to construct TWSE HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn url_for(&self, symbol: &str) -> String {
        format!(
            "{}?ex_ch=tse_{}.tw&json=1&delay=0",
            self.endpoint,
            symbol.to_lowercase()
        )
    }
}

#[async_trait]
impl QuoteSource for TwseQuoteSource {
    fn name(&self) -> &str {
        "twse"
    }

    async fn fetch(&self, symbol: &str) -> FetchResult<SourceQuote> {
        let url = self.url_for(symbol);
        let mut retry_count = 0;

        loop {
            let outcome = self.client.get(&url).send().await;
            let error = match outcome {
                Ok(response) if response.status().is_success() => {
                    let body = response.text().await?;
                    return parse_stock_info(symbol, &body);
                }
                Ok(response) if response.status() == StatusCode::FORBIDDEN => {
                    return Err(AppError::message(format!(
                        "Request for {} was blocked by the exchange",
                        symbol
                    )));
                }
                Ok(response) => AppError::message(format!(
                    "Request for {} failed with status {}",
                    symbol,
                    response.status()
                )),
                Err(err) => AppError::from(err),
            };

            retry_count += 1;
            if retry_count >= MAX_RETRIES {
                return Err(error);
            }
            log::debug!("retrying {symbol} after attempt {retry_count}: {error}");
            // Back off exponentially before retrying.
            sleep(Duration::from_millis(2_u64.pow(retry_count) * 250)).await;
        }
    }
}

fn parse_stock_info(symbol: &str, body: &str) -> FetchResult<SourceQuote> {
    let response: StockInfoResponse =
        serde_json::from_str(body).context("Failed to parse TWSE response")?;

    let Some(row) = response
        .msg_array
        .into_iter()
        .find(|row| row.code.as_deref().map_or(true, |c| c.eq_ignore_ascii_case(symbol)))
    else {
        return Err(AppError::NotFound(symbol.to_string()));
    };

    let prev_close = row.prev_close.as_deref().and_then(parse_price);
    let price = row
        .last
        .as_deref()
        .and_then(parse_price)
        .or_else(|| {
            row.bids
                .as_deref()
                .and_then(|bids| bids.split('_').find_map(parse_price))
        })
        .or(prev_close)
        .with_context(|| format!("No usable price in TWSE response for {}", symbol))?;

    let volume = row
        .volume
        .as_deref()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    Ok(SourceQuote {
        name: row
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| symbol.to_string()),
        price,
        volume,
        prev_close,
    })
}

fn parse_price(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_traded_price() {
        let body = r#"{"msgArray":[{"c":"2330","n":"台積電","z":"940.0000","b":"939.0000_938.0000_","v":"1000","y":"925.0000"}],"rtcode":"0000"}"#;
        let quote = parse_stock_info("2330", body).expect("quote");
        assert_eq!(quote.name, "台積電");
        assert!((quote.price - 940.0).abs() < 1e-9);
        assert_eq!(quote.volume, 1000);
        assert_eq!(quote.prev_close, Some(925.0));
    }

    #[test]
    fn falls_back_to_best_bid_then_previous_close() {
        let with_bid = r#"{"msgArray":[{"c":"2454","n":"聯發科","z":"-","b":"1095.0000_1090.0000_","v":"12","y":"1100.0000"}]}"#;
        let quote = parse_stock_info("2454", with_bid).expect("quote");
        assert!((quote.price - 1095.0).abs() < 1e-9);

        let no_bid = r#"{"msgArray":[{"c":"2454","n":"聯發科","z":"-","b":"-","v":"0","y":"1100.0000"}]}"#;
        let quote = parse_stock_info("2454", no_bid).expect("quote");
        assert!((quote.price - 1100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_message_array_is_not_found() {
        let err = parse_stock_info("9999", r#"{"msgArray":[],"rtcode":"0000"}"#)
            .expect_err("missing symbol");
        assert!(err.is_not_found());
    }

    #[test]
    fn malformed_body_is_a_failure() {
        let err = parse_stock_info("2330", "<html>").expect_err("bad body");
        assert!(!err.is_not_found());
    }
}
