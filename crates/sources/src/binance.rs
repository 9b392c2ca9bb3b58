//! Binance USD-M futures adapter.
//!
//! `GET /fapi/v1/premiumIndex` without a symbol returns every contract in
//! one call, with mark price and last funding rate as decimal strings.

use async_trait::async_trait;
use chrono::Utc;
use fundwatch_core::types::Timestamp;
use fundwatch_core::{Credentials, Signal, VenueKind};
use serde::Deserialize;

use crate::error::SourceError;
use crate::http::{fetch_json, parse_decimal, to_percent_points, usdt_base};
use crate::source::SignalSource;

pub const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// One entry of the `premiumIndex` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumIndex {
    pub symbol: String,
    pub mark_price: String,
    pub last_funding_rate: String,
}

pub struct BinanceSource {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    /// Point the adapter at a different host (testnet, proxy).
    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SignalSource for BinanceSource {
    fn venue(&self) -> VenueKind {
        VenueKind::Binance
    }

    async fn fetch_signals(&self, credentials: &Credentials) -> Result<Vec<Signal>, SourceError> {
        let mut request = self
            .client
            .get(format!("{}/fapi/v1/premiumIndex", self.base_url));
        if credentials.has_key() {
            request = request.header(API_KEY_HEADER, credentials.api_key.trim());
        }

        let entries: Vec<PremiumIndex> = fetch_json(VenueKind::Binance, request).await?;
        Ok(parse_premium_index(entries, Utc::now()))
    }
}

/// Convert `premiumIndex` entries into signals.
pub fn parse_premium_index(entries: Vec<PremiumIndex>, captured_at: Timestamp) -> Vec<Signal> {
    let venue = VenueKind::Binance.name();

    entries
        .into_iter()
        .filter_map(|entry| {
            let symbol = usdt_base(&entry.symbol)?.to_string();
            let (Some(price), Some(rate)) = (
                parse_decimal(&entry.mark_price),
                parse_decimal(&entry.last_funding_rate),
            ) else {
                tracing::debug!(pair = %entry.symbol, "Binance: skipping unparseable entry");
                return None;
            };
            if price <= 0.0 {
                return None;
            }
            Some(Signal::new(
                venue,
                symbol,
                entry.symbol,
                price,
                to_percent_points(rate),
                captured_at,
            ))
        })
        .collect()
}
