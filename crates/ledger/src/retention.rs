//! Periodic purge of expired cooldown records.
//!
//! Runs on a fixed `tokio::time::interval`. The first tick fires
//! immediately, so a ledger left over from a long outage is trimmed as soon
//! as monitoring starts.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ledger::CooldownLedger;

/// Run the retention loop until `cancel` is triggered.
///
/// Removes records older than `retention` every `every`. Failures are
/// logged and retried on the next tick.
pub async fn run(
    ledger: Arc<CooldownLedger>,
    retention: chrono::Duration,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_hours = retention.num_hours(),
        interval_secs = every.as_secs(),
        "Ledger retention job started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Ledger retention job stopping");
                break;
            }
            _ = interval.tick() => {
                match ledger.cleanup(retention).await {
                    Ok(purged) if purged > 0 => {
                        tracing::info!(purged, "Ledger retention: purged expired records");
                    }
                    Ok(_) => {
                        tracing::debug!("Ledger retention: nothing to purge");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Ledger retention: cleanup failed");
                    }
                }
            }
        }
    }
}
