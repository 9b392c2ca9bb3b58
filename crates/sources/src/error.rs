use fundwatch_core::VenueKind;

/// Errors from fetching one venue's signals.
///
/// Always scoped to a single venue and a single cycle; the scheduler logs
/// them and carries on with the remaining venues.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The venue returned a non-2xx status code.
    #[error("{venue} returned HTTP {status}: {body}")]
    Status {
        venue: VenueKind,
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The venue answered 2xx but flagged the call as failed in its envelope.
    #[error("{venue} API error ({code}): {message}")]
    Api {
        venue: VenueKind,
        code: i64,
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}
