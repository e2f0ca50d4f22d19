// mask-store/src/error.rs
use crate::address::AddressError;
use thiserror::Error;

/// Error from a mapping store operation
#[derive(Debug, Error)]
pub enum StoreError {
    /// The masked address is already bound, including to an expired mapping.
    #[error("masked address already exists")]
    DuplicateAddress,
    /// The real address failed validation; nothing was stored.
    #[error("invalid real address: {0}")]
    InvalidRealAddress(#[from] AddressError),
    /// No mapping for the masked address.
    #[error("masked address not found")]
    NotFound,
    /// A persisted record could not be decoded.
    #[error("corrupt mapping record: {0}")]
    Corrupt(String),
    /// Backend failure (I/O, pool, SQL).
    #[error("database error: {0}")]
    Database(String),
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}
