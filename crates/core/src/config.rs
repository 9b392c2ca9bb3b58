//! Monitoring configuration and pre-start validation.
//!
//! [`MonitorConfig`] is read once when a session starts. Validation runs
//! before any background work is spawned, so a bad configuration never
//! produces a half-started monitor.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;
use crate::venue::VenueKind;

/// Threshold applied when a venue has none configured: alert at <= -0.1%.
pub const DEFAULT_THRESHOLD: f64 = -0.1;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_COOLDOWN_HOURS: i64 = 8;
pub const DEFAULT_RETENTION_HOURS: i64 = 24;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_PACING_MILLIS: u64 = 200;

/// Upper bound for cooldown and retention windows: ten years.
pub const MAX_WINDOW_HOURS: i64 = 10 * 365 * 24;

/// Number of notification channels exposed through the environment.
const ENV_CHANNEL_COUNT: usize = 2;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// API credentials handed to a signal source on every fetch.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret,
        }
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn has_secret(&self) -> bool {
        self.api_secret
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

/// Keys never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &self.api_secret.as_deref().map(redact))
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

// ---------------------------------------------------------------------------
// Venue / channel configuration
// ---------------------------------------------------------------------------

/// Per-venue enablement, credentials and signed threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueConfig {
    pub venue: VenueKind,
    pub enabled: bool,
    pub credentials: Credentials,
    /// Signed threshold in percent points. Negative means "alert when the
    /// rate drops to or below"; non-negative means "alert when it rises to
    /// or above".
    pub threshold: f64,
}

impl VenueConfig {
    /// An enabled venue with the given credentials and threshold.
    pub fn enabled(venue: VenueKind, credentials: Credentials, threshold: f64) -> Self {
        Self {
            venue,
            enabled: true,
            credentials,
            threshold,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.credentials.has_key() {
            return Err(ConfigError::MissingApiKey { venue: self.venue });
        }
        if self.venue.requires_secret() && !self.credentials.has_secret() {
            return Err(ConfigError::MissingApiSecret { venue: self.venue });
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold {
                venue: self.venue,
                value: self.threshold,
            });
        }
        Ok(())
    }
}

/// One notification destination (e.g. a Telegram chat).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub enabled: bool,
    pub channel_id: String,
}

impl ChannelConfig {
    pub fn enabled(channel_id: impl Into<String>) -> Self {
        Self {
            enabled: true,
            channel_id: channel_id.into(),
        }
    }
}

/// A channel id is either a signed numeric chat id or an `@username`.
pub fn is_valid_channel_id(channel_id: &str) -> bool {
    let id = channel_id.trim();
    if id.parse::<i64>().is_ok() {
        return true;
    }
    match id.strip_prefix('@') {
        Some(name) => {
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Cadences and windows shared by the scheduler, ledger and fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub poll_interval_secs: u64,
    pub cooldown_hours: i64,
    pub retention_hours: i64,
    pub cleanup_interval_secs: u64,
    pub pacing_millis: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            cooldown_hours: DEFAULT_COOLDOWN_HOURS,
            retention_hours: DEFAULT_RETENTION_HOURS,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            pacing_millis: DEFAULT_PACING_MILLIS,
        }
    }
}

impl Timing {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Clamped to `0..=MAX_WINDOW_HOURS`; [`validate`](Self::validate)
    /// rejects anything outside that range.
    pub fn cooldown(&self) -> chrono::Duration {
        window(self.cooldown_hours)
    }

    pub fn retention(&self) -> chrono::Duration {
        window(self.retention_hours)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_millis)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(invalid("POLL_INTERVAL_SECS", self.poll_interval_secs));
        }
        if !(0..=MAX_WINDOW_HOURS).contains(&self.cooldown_hours) {
            return Err(invalid("COOLDOWN_HOURS", self.cooldown_hours));
        }
        if !(0..=MAX_WINDOW_HOURS).contains(&self.retention_hours) {
            return Err(invalid("RETENTION_HOURS", self.retention_hours));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(invalid("CLEANUP_INTERVAL_SECS", self.cleanup_interval_secs));
        }
        Ok(())
    }
}

fn window(hours: i64) -> chrono::Duration {
    chrono::Duration::hours(hours.clamp(0, MAX_WINDOW_HOURS))
}

fn invalid(var: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// MonitorConfig
// ---------------------------------------------------------------------------

/// Everything a monitoring session needs, consumed on start.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub venues: Vec<VenueConfig>,
    /// Delivery order follows this list.
    pub channels: Vec<ChannelConfig>,
    /// Transport credential for the notifier (e.g. a Telegram bot token).
    pub bot_token: Option<String>,
    /// Optional call-to-action link attached to every alert.
    pub action_url: Option<String>,
    pub timing: Timing,
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                      | Default               |
    /// |-------------------------------|-----------------------|
    /// | `<VENUE>_API_KEY`             | empty                 |
    /// | `<VENUE>_API_SECRET`          | none                  |
    /// | `<VENUE>_ENABLED`             | `true` if key is set  |
    /// | `<VENUE>_THRESHOLD`           | `-0.1`                |
    /// | `TELEGRAM_BOT_TOKEN`          | none                  |
    /// | `TELEGRAM_CHANNEL_<N>_ID`     | empty                 |
    /// | `TELEGRAM_CHANNEL_<N>_ENABLED`| `true` if id is set   |
    /// | `TRADE_BOT_URL`               | none                  |
    /// | `TRADE_BOT_ENABLED`           | `true` if url is set  |
    /// | `POLL_INTERVAL_SECS`          | `60`                  |
    /// | `COOLDOWN_HOURS`              | `8`                   |
    /// | `RETENTION_HOURS`             | `24`                  |
    /// | `CLEANUP_INTERVAL_SECS`       | `3600`                |
    /// | `PACING_MILLIS`               | `200`                 |
    ///
    /// `<VENUE>` is one of `BINANCE`, `BYBIT`, `MEXC`; `<N>` is `1` or `2`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Only parse errors are reported here; semantic checks live in
    /// [`validate`](Self::validate).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut venues = Vec::with_capacity(VenueKind::ALL.len());
        for venue in VenueKind::ALL {
            let prefix = venue.env_prefix();
            let api_key = get(&format!("{prefix}_API_KEY")).unwrap_or_default();
            let api_secret = get(&format!("{prefix}_API_SECRET"));
            let enabled =
                parse_or(&get, &format!("{prefix}_ENABLED"), !api_key.is_empty(), parse_bool)?;
            let threshold = parse_or(&get, &format!("{prefix}_THRESHOLD"), DEFAULT_THRESHOLD, |v| {
                v.parse::<f64>().ok()
            })?;

            venues.push(VenueConfig {
                venue,
                enabled,
                credentials: Credentials::new(api_key, api_secret),
                threshold,
            });
        }

        let mut channels = Vec::with_capacity(ENV_CHANNEL_COUNT);
        for n in 1..=ENV_CHANNEL_COUNT {
            let channel_id = get(&format!("TELEGRAM_CHANNEL_{n}_ID")).unwrap_or_default();
            let enabled = parse_or(
                &get,
                &format!("TELEGRAM_CHANNEL_{n}_ENABLED"),
                !channel_id.is_empty(),
                parse_bool,
            )?;
            channels.push(ChannelConfig {
                enabled,
                channel_id: channel_id.trim().to_string(),
            });
        }

        let trade_bot_url = get("TRADE_BOT_URL");
        let trade_bot_enabled =
            parse_or(&get, "TRADE_BOT_ENABLED", trade_bot_url.is_some(), parse_bool)?;
        let action_url = trade_bot_url.filter(|_| trade_bot_enabled);

        let defaults = Timing::default();
        let timing = Timing {
            poll_interval_secs: parse_or(
                &get,
                "POLL_INTERVAL_SECS",
                defaults.poll_interval_secs,
                |v| v.parse().ok(),
            )?,
            cooldown_hours: parse_or(&get, "COOLDOWN_HOURS", defaults.cooldown_hours, |v| {
                v.parse().ok()
            })?,
            retention_hours: parse_or(&get, "RETENTION_HOURS", defaults.retention_hours, |v| {
                v.parse().ok()
            })?,
            cleanup_interval_secs: parse_or(
                &get,
                "CLEANUP_INTERVAL_SECS",
                defaults.cleanup_interval_secs,
                |v| v.parse().ok(),
            )?,
            pacing_millis: parse_or(&get, "PACING_MILLIS", defaults.pacing_millis, |v| {
                v.parse().ok()
            })?,
        };

        Ok(Self {
            venues,
            channels,
            bot_token: get("TELEGRAM_BOT_TOKEN"),
            action_url,
            timing,
        })
    }

    /// Check everything a session needs before it may start.
    ///
    /// Order of checks: transport credential, venues, channels, timing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self
            .bot_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
        {
            return Err(ConfigError::MissingBotToken);
        }

        let mut any_venue = false;
        for venue in self.enabled_venues() {
            venue.validate()?;
            any_venue = true;
        }
        if !any_venue {
            return Err(ConfigError::NoVenueEnabled);
        }

        let mut any_channel = false;
        for (idx, channel) in self.channels.iter().enumerate() {
            if !channel.enabled {
                continue;
            }
            let index = idx + 1;
            if channel.channel_id.trim().is_empty() {
                return Err(ConfigError::MissingChannelId { index });
            }
            if !is_valid_channel_id(&channel.channel_id) {
                return Err(ConfigError::InvalidChannelId {
                    index,
                    channel_id: channel.channel_id.clone(),
                });
            }
            any_channel = true;
        }
        if !any_channel {
            return Err(ConfigError::NoChannelEnabled);
        }

        self.timing.validate()
    }

    pub fn enabled_venues(&self) -> impl Iterator<Item = &VenueConfig> {
        self.venues.iter().filter(|v| v.enabled)
    }

    /// Enabled channel ids, in delivery order.
    pub fn enabled_channel_ids(&self) -> Vec<String> {
        self.channels
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.channel_id.trim().to_string())
            .collect()
    }
}

fn parse_or<T, G, P>(get: &G, var: &str, default: T, parse: P) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => parse(raw.trim()).ok_or_else(|| invalid(var, raw)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
