// mailmask-core/src/error.rs
use mask_store::StoreError;
use thiserror::Error;

use crate::relay::RelayError;

/// Error from the request service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller input was rejected before any generation work; the message
    /// is safe to show to the requester verbatim.
    #[error("{0}")]
    InvalidInput(String),
    /// Every generation attempt collided. Practically unreachable with a
    /// healthy entropy source; treated as an operational failure.
    #[error("masked address generation exhausted after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },
    /// The store failed for a reason other than a duplicate.
    #[error("mapping store error: {0}")]
    Store(#[from] StoreError),
}

/// Error from inbound mail handling
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("mapping store error: {0}")]
    Store(#[from] StoreError),
    #[error("relay handoff failed: {0}")]
    Relay(#[from] RelayError),
}
