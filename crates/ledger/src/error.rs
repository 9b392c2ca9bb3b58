/// Error type for ledger persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Reading or writing the backing file failed.
    #[error("Ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted image could not be parsed or serialized.
    #[error("Ledger JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store refused the operation for another reason.
    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),
}
