//! Shared HTTP plumbing for the venue adapters.

use std::time::Duration;

use fundwatch_core::VenueKind;
use serde::de::DeserializeOwned;

use crate::error::SourceError;

/// Per-request timeout applied to every venue call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Quote asset every adapter filters on.
pub const QUOTE_ASSET: &str = "USDT";

/// Build the client shared by all sources.
pub fn build_client() -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("fundwatch/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Send `request` and decode a successful JSON body.
pub async fn fetch_json<T: DeserializeOwned>(
    venue: VenueKind,
    request: reqwest::RequestBuilder,
) -> Result<T, SourceError> {
    let response = request.send().await?;
    let response = ensure_success(venue, response).await?;
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Return the response unchanged on 2xx, or a [`SourceError::Status`]
/// carrying the status and body text.
async fn ensure_success(
    venue: VenueKind,
    response: reqwest::Response,
) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(SourceError::Status {
            venue,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Base asset of a USDT-quoted pair, e.g. `"BTCUSDT"` -> `"BTC"`.
pub fn usdt_base(pair: &str) -> Option<&str> {
    pair.strip_suffix(QUOTE_ASSET).filter(|base| !base.is_empty())
}

/// Venue funding rates are fractions; signals carry percent points.
pub fn to_percent_points(fraction: f64) -> f64 {
    fraction * 100.0
}

/// Parse a decimal string field, treating an empty string as absent.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
