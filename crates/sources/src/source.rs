use async_trait::async_trait;
use fundwatch_core::{Credentials, Signal, VenueKind};

use crate::error::SourceError;

/// A venue that can report its current funding rates.
///
/// Implementations must tag every returned signal with
/// [`venue().name()`](VenueKind::name) and must drop instruments without a
/// strictly positive price.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// The venue this source polls.
    fn venue(&self) -> VenueKind;

    /// Fetch one snapshot of every USDT-quoted perpetual on the venue.
    async fn fetch_signals(&self, credentials: &Credentials) -> Result<Vec<Signal>, SourceError>;
}
