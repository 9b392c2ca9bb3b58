//! Telegram Bot API delivery with backoff retry.
//!
//! [`TelegramNotifier`] renders a [`Signal`] as a Markdown message and posts
//! it through `sendMessage`. Transport errors, HTTP 429 and 5xx responses
//! are retried twice (after 1 s, then 2 s); any other rejection fails
//! immediately with Telegram's `description`.

use std::time::Duration;

use async_trait::async_trait;
use fundwatch_core::Signal;
use serde::Deserialize;

use super::{DeliveryError, Notifier};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Backoff before each retry (1s, 2s).
const RETRY_DELAYS_SECS: [u64; 2] = [1, 2];

/// Bot API error envelope: `{"ok": false, "error_code": 400, "description": "..."}`.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    description: Option<String>,
}

// ---------------------------------------------------------------------------
// TelegramNotifier
// ---------------------------------------------------------------------------

pub struct TelegramNotifier {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, token: impl Into<String>) -> Self {
        Self::with_api_base(client, token, DEFAULT_API_BASE)
    }

    /// Point the notifier at a different Bot API server.
    pub fn with_api_base(
        client: reqwest::Client,
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token: token.into(),
            api_base: api_base.into(),
        }
    }

    /// Execute a single `sendMessage` call and check the response status.
    async fn try_send(&self, payload: &serde_json::Value) -> Result<(), DeliveryError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);

        // Strip the URL from transport errors: it carries the bot token.
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.without_url()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let description = serde_json::from_str::<ApiError>(&body)
            .ok()
            .and_then(|e| e.description)
            .unwrap_or(body);

        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            description,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(
        &self,
        signal: &Signal,
        channel_id: &str,
        action_url: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let payload = serde_json::json!({
            "chat_id": chat_id_value(channel_id),
            "text": format_message(signal, action_url),
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        let mut attempt = 0;
        loop {
            match self.try_send(&payload).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < RETRY_DELAYS_SECS.len() => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        channel_id,
                        error = %e,
                        "Telegram send attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(RETRY_DELAYS_SECS[attempt])).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Numeric chat ids go out as JSON numbers, usernames as strings.
fn chat_id_value(channel_id: &str) -> serde_json::Value {
    let id = channel_id.trim();
    match id.parse::<i64>() {
        Ok(n) => serde_json::Value::from(n),
        Err(_) => serde_json::Value::from(id),
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Render the Markdown alert text for `signal`.
pub fn format_message(signal: &Signal, action_url: Option<&str>) -> String {
    let venue_link = venue_url(&signal.venue, &signal.pair);
    let chart_link = coinglass_url(&signal.venue, &signal.pair);

    let mut lines = vec![
        format!(
            "⚫️ [{}]({}) - [{}]({}) - {}",
            signal.venue, venue_link, signal.symbol, chart_link, signal.pair
        ),
        if signal.funding_rate < 0.0 {
            "🟢 Analyzing Buy ⬆️".to_string()
        } else {
            "🔴 Analyzing Sell ⬇️".to_string()
        },
        format!("🅿️ {:.4}", signal.current_price),
        format!("📃 {:.4}%", signal.funding_rate),
    ];

    if let Some(target) = signal.target_price {
        lines.push(format!("🎯 TP {target:.4}"));
    }

    if let Some(url) = action_url.map(str::trim).filter(|u| !u.is_empty()) {
        lines.push(format!("[🌐 Trade]({url})"));
    }

    lines.push(format!(
        "Since: {}",
        signal.captured_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    lines.join("\n")
}

/// Futures trading page for `pair` on `venue`.
pub fn venue_url(venue: &str, pair: &str) -> String {
    match venue.to_ascii_uppercase().as_str() {
        "BINANCE" => format!("https://www.binance.com/en/futures/{pair}"),
        "BYBIT" => format!("https://www.bybit.com/trade/usdt/{pair}"),
        "MEXC" => format!(
            "https://futures.mexc.com/exchange/{}",
            pair.replace("USDT", "_USDT")
        ),
        _ => format!("https://www.{}.com", venue.to_ascii_lowercase()),
    }
}

/// CoinGlass chart for `pair`. The venue segment is capitalized except for
/// MEXC, which CoinGlass spells in upper case.
pub fn coinglass_url(venue: &str, pair: &str) -> String {
    let segment = if venue.eq_ignore_ascii_case("MEXC") {
        "MEXC".to_string()
    } else {
        let lower = venue.to_ascii_lowercase();
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    };
    format!("https://www.coinglass.com/tv/{segment}_{pair}")
}
