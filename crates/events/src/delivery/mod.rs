//! External delivery channels for triggered alerts.
//!
//! A [`Notifier`] owns formatting and transport for one kind of channel.
//! The fan-out only decides who gets what and in which order.

pub mod telegram;

use async_trait::async_trait;
use fundwatch_core::Signal;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for a single channel send.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The HTTP request itself failed (network, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The channel API answered with a non-2xx status.
    #[error("Channel rejected message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },

    /// The notifier cannot send at all (misconfigured, shut down).
    #[error("Notifier unavailable: {0}")]
    Unavailable(String),
}

impl DeliveryError {
    /// Transport failures, rate limiting and server errors are worth
    /// another attempt; anything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::Unavailable(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Sends one presentation signal to one channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// `action_url` of `None` or `""` omits the call-to-action link.
    async fn send(
        &self,
        signal: &Signal,
        channel_id: &str,
        action_url: Option<&str>,
    ) -> Result<(), DeliveryError>;
}
