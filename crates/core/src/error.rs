use crate::venue::VenueKind;

/// Reasons a monitoring session refuses to start.
///
/// Every variant names the check that failed so the operator can fix the
/// configuration without digging through logs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("At least one venue must be enabled for monitoring")]
    NoVenueEnabled,

    #[error("{venue} is enabled but its API key is missing")]
    MissingApiKey { venue: VenueKind },

    #[error("{venue} is enabled but its API secret is missing")]
    MissingApiSecret { venue: VenueKind },

    #[error("{venue} threshold must be a finite number, got {value}")]
    InvalidThreshold { venue: VenueKind, value: f64 },

    #[error("{venue} is enabled but no signal source is registered for it")]
    NoSourceForVenue { venue: VenueKind },

    #[error("At least one delivery channel must be enabled")]
    NoChannelEnabled,

    #[error("Channel {index} is enabled but has no channel id")]
    MissingChannelId { index: usize },

    #[error("Channel {index} has an invalid channel id '{channel_id}'")]
    InvalidChannelId { index: usize, channel_id: String },

    #[error("A bot token is required to deliver notifications")]
    MissingBotToken,

    #[error("Unknown venue '{0}'. Must be one of: Binance, Bybit, MEXC")]
    UnknownVenue(String),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },
}
