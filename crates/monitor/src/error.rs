use fundwatch_core::ConfigError;

/// Reasons [`Monitor::start`](crate::Monitor::start) can refuse to run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MonitorError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Monitoring is already running")]
    AlreadyRunning,

    #[error("Monitoring is still stopping")]
    StopInProgress,
}
