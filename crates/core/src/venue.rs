//! Supported derivatives venues.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A derivatives exchange that publishes funding rates.
///
/// The display [`name`](VenueKind::name) doubles as the first component of
/// the dedup key, so it must stay stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VenueKind {
    Binance,
    Bybit,
    Mexc,
}

impl VenueKind {
    /// Every supported venue, in display-name order.
    pub const ALL: [VenueKind; 3] = [VenueKind::Binance, VenueKind::Bybit, VenueKind::Mexc];

    /// Name used on signals, in the ledger, and in messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Binance => "Binance",
            Self::Bybit => "Bybit",
            Self::Mexc => "MEXC",
        }
    }

    /// Parse a venue name, ignoring case.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(Self::Binance),
            "bybit" => Ok(Self::Bybit),
            "mexc" => Ok(Self::Mexc),
            _ => Err(ConfigError::UnknownVenue(name.to_string())),
        }
    }

    /// Binance signs every private call, so it needs both key and secret.
    pub fn requires_secret(self) -> bool {
        matches!(self, Self::Binance)
    }

    /// Prefix of the environment variables configuring this venue.
    pub fn env_prefix(self) -> &'static str {
        match self {
            Self::Binance => "BINANCE",
            Self::Bybit => "BYBIT",
            Self::Mexc => "MEXC",
        }
    }
}

impl fmt::Display for VenueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
