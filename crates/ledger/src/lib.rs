//! Durable cooldown ledger for sent alerts.
//!
//! - [`CooldownLedger`] -- answers "may this key alert again?" and records
//!   sends. The only component allowed to mutate [`SentRecord`]s.
//! - [`LedgerStore`] -- persistence seam, with [`JsonFileStore`] for
//!   production and [`MemoryStore`] for tests and ephemeral runs.
//! - [`retention`] -- background job purging records past retention.

pub mod error;
pub mod ledger;
pub mod record;
pub mod retention;
pub mod store;

pub use error::LedgerError;
pub use ledger::CooldownLedger;
pub use record::SentRecord;
pub use store::{JsonFileStore, LedgerStore, MemoryStore};
