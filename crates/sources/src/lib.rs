//! Funding-rate signal sources.
//!
//! Each adapter wraps one venue's public REST ticker endpoint and turns its
//! response into normalized [`Signal`](fundwatch_core::Signal)s: USDT-quoted
//! contracts only, positive prices only, funding rates in percent points.
//!
//! Response parsing lives in pure `parse_*` functions so it can be tested
//! against recorded payloads without a network.

pub mod binance;
pub mod bybit;
pub mod error;
pub mod http;
pub mod mexc;
pub mod source;

pub use binance::BinanceSource;
pub use bybit::BybitSource;
pub use error::SourceError;
pub use mexc::MexcSource;
pub use source::SignalSource;
