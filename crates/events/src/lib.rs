//! Monitoring events and alert delivery.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub for [`MonitorEvent`]s,
//!   backed by `tokio::sync::broadcast`. The daemon subscribes to log them.
//! - [`delivery`] -- the [`Notifier`] seam and its Telegram implementation.
//! - [`EventLog`] -- writes every event through `tracing`.
//! - [`DeliveryFanout`] -- sends triggered signals to every enabled channel
//!   in order, gated and recorded by the cooldown ledger.

pub mod bus;
pub mod delivery;
pub mod fanout;
pub mod log;

pub use bus::{EventBus, EventKind, MonitorEvent};
pub use delivery::telegram::TelegramNotifier;
pub use delivery::{DeliveryError, Notifier};
pub use fanout::{DeliveryFanout, DispatchReport, FanoutSettings};
pub use log::EventLog;
