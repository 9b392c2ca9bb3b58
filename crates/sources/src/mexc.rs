//! MEXC contract adapter.
//!
//! MEXC spells pairs with an underscore (`BTC_USDT`) and reports prices and
//! funding rates as JSON numbers.

use async_trait::async_trait;
use chrono::Utc;
use fundwatch_core::types::Timestamp;
use fundwatch_core::{Credentials, Signal, VenueKind};
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{fetch_json, to_percent_points, usdt_base};
use crate::source::SignalSource;

pub const DEFAULT_BASE_URL: &str = "https://contract.mexc.com";

const API_KEY_HEADER: &str = "ApiKey";

#[derive(Debug, Deserialize)]
pub struct TickerResponse {
    pub success: bool,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<ContractTicker>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractTicker {
    pub symbol: String,
    /// `null` for contracts that have not traded yet.
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default)]
    pub funding_rate: Option<f64>,
}

pub struct MexcSource {
    client: reqwest::Client,
    base_url: String,
}

impl MexcSource {
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
impl SignalSource for MexcSource {
    fn venue(&self) -> VenueKind {
        VenueKind::Mexc
    }

    async fn fetch_signals(&self, credentials: &Credentials) -> Result<Vec<Signal>, SourceError> {
        let mut request = self
            .client
            .get(format!("{}/api/v1/contract/ticker", self.base_url));
        if credentials.has_key() {
            request = request.header(API_KEY_HEADER, credentials.api_key.trim());
        }

        let response: TickerResponse = fetch_json(VenueKind::Mexc, request).await?;
        parse_contract_tickers(response, Utc::now())
    }
}

/// `"BTC_USDT"` -> `"BTCUSDT"`.
pub fn normalize_pair(symbol: &str) -> String {
    symbol.replace('_', "")
}

pub fn parse_contract_tickers(
    response: TickerResponse,
    captured_at: Timestamp,
) -> Result<Vec<Signal>, SourceError> {
    if !response.success {
        return Err(SourceError::Api {
            venue: VenueKind::Mexc,
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }

    let venue = VenueKind::Mexc.name();

    Ok(response
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|ticker| {
            let pair = normalize_pair(&ticker.symbol);
            let symbol = usdt_base(&pair)?.to_string();
            let price = ticker.last_price.filter(|p| p.is_finite() && *p > 0.0)?;
            let rate = ticker.funding_rate.filter(|r| r.is_finite())?;
            Some(Signal::new(
                venue,
                symbol,
                pair,
                price,
                to_percent_points(rate),
                captured_at,
            ))
        })
        .collect())
}
