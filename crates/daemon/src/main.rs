use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fundwatch_core::MonitorConfig;
use fundwatch_events::{EventBus, EventLog, TelegramNotifier};
use fundwatch_ledger::store::DEFAULT_LEDGER_FILE;
use fundwatch_ledger::{CooldownLedger, JsonFileStore};
use fundwatch_monitor::Monitor;
use fundwatch_sources::{BinanceSource, BybitSource, MexcSource, SignalSource};

const DEFAULT_LOG_FILTER: &str = "fundwatch=info,fundwatch_monitor=info,fundwatch_events=info,\
                                  fundwatch_ledger=info,fundwatch_sources=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = MonitorConfig::from_env().context("Failed to load configuration")?;
    let ledger_path =
        std::env::var("LEDGER_PATH").unwrap_or_else(|_| DEFAULT_LEDGER_FILE.to_string());
    tracing::info!(
        venues = config.enabled_venues().count(),
        channels = config.enabled_channel_ids().len(),
        ledger = %ledger_path,
        "Loaded monitor configuration"
    );

    // --- Collaborators ---
    let client = fundwatch_sources::http::build_client().context("Failed to build HTTP client")?;
    let sources: Vec<Arc<dyn SignalSource>> = vec![
        Arc::new(BinanceSource::new(client.clone())),
        Arc::new(BybitSource::new(client.clone())),
        Arc::new(MexcSource::new(client.clone())),
    ];
    let notifier = Arc::new(TelegramNotifier::new(
        client,
        config.bot_token.clone().unwrap_or_default(),
    ));
    let ledger = Arc::new(CooldownLedger::open(Arc::new(JsonFileStore::new(ledger_path))).await);

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let log_handle = tokio::spawn(EventLog::run(event_bus.subscribe()));

    // --- Monitor ---
    let monitor = Monitor::new(config, sources, notifier, ledger, Arc::clone(&event_bus));
    if let Err(e) = monitor.start().await {
        tracing::error!(error = %e, "Failed to start monitoring");
        return Err(e).context("Monitoring could not start");
    }

    shutdown_signal().await;

    monitor.stop().await;

    // Dropping every bus handle closes the channel and ends the event log.
    drop(monitor);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), log_handle).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
///
/// A handler that cannot be installed is logged and never fires; the other
/// one still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), stopping monitor");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping monitor");
        }
    }
}
