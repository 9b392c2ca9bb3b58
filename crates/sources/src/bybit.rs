//! Bybit v5 linear-perpetual adapter.

use async_trait::async_trait;
use chrono::Utc;
use fundwatch_core::types::Timestamp;
use fundwatch_core::{Credentials, Signal, VenueKind};
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{fetch_json, parse_decimal, to_percent_points, usdt_base};
use crate::source::SignalSource;

pub const DEFAULT_BASE_URL: &str = "https://api.bybit.com";

const API_KEY_HEADER: &str = "X-BAPI-API-KEY";

/// Envelope of every v5 response. `ret_code` 0 means success.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickersResponse {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    #[serde(default)]
    pub result: Option<TickerList>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TickerList {
    #[serde(default)]
    pub list: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    pub last_price: String,
    #[serde(default)]
    pub funding_rate: String,
}

pub struct BybitSource {
    client: reqwest::Client,
    base_url: String,
}

impl BybitSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SignalSource for BybitSource {
    fn venue(&self) -> VenueKind {
        VenueKind::Bybit
    }

    async fn fetch_signals(&self, credentials: &Credentials) -> Result<Vec<Signal>, SourceError> {
        let mut request = self
            .client
            .get(format!("{}/v5/market/tickers", self.base_url))
            .query(&[("category", "linear")]);
        if credentials.has_key() {
            request = request.header(API_KEY_HEADER, credentials.api_key.trim());
        }

        let response: TickersResponse = fetch_json(VenueKind::Bybit, request).await?;
        parse_tickers(response, Utc::now())
    }
}

/// Unwrap the v5 envelope and convert tickers into signals.
///
/// Pre-launch contracts report an empty funding rate; those count as 0.
pub fn parse_tickers(
    response: TickersResponse,
    captured_at: Timestamp,
) -> Result<Vec<Signal>, SourceError> {
    if response.ret_code != 0 {
        return Err(SourceError::Api {
            venue: VenueKind::Bybit,
            code: response.ret_code,
            message: response.ret_msg,
        });
    }

    let venue = VenueKind::Bybit.name();
    let tickers = response.result.unwrap_or_default().list;

    Ok(tickers
        .into_iter()
        .filter_map(|ticker| {
            let symbol = usdt_base(&ticker.symbol)?.to_string();
            let price = parse_decimal(&ticker.last_price).filter(|p| *p > 0.0)?;
            let rate = if ticker.funding_rate.trim().is_empty() {
                0.0
            } else {
                match parse_decimal(&ticker.funding_rate) {
                    Some(rate) => rate,
                    None => {
                        tracing::debug!(pair = %ticker.symbol, "Bybit: skipping unparseable funding rate");
                        return None;
                    }
                }
            };
            Some(Signal::new(
                venue,
                symbol,
                ticker.symbol,
                price,
                to_percent_points(rate),
                captured_at,
            ))
        })
        .collect())
}
