// mask-store/src/store/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::types::{MaskedMapping, Plan};

/// Storage contract for masked-address mappings.
///
/// Implementations must make `create` atomic: when two callers race on the
/// same masked address, exactly one wins and the other sees
/// [`StoreError::DuplicateAddress`]. An address stays taken for the lifetime
/// of the store, expired or not, so a token is never silently rebound.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Bind `masked_address` to `real_address` under `plan`, with the expiry
    /// computed from `now`. The real address is validated before anything is
    /// written. Returns the stored mapping.
    async fn create(
        &self,
        masked_address: &str,
        real_address: &str,
        plan: Plan,
        now: DateTime<Utc>,
    ) -> Result<MaskedMapping, StoreError>;

    /// Fetch a mapping in any status, or `None` when the address was never
    /// bound. Expired mappings are returned; whether to honor them is the
    /// caller's decision.
    async fn lookup(&self, masked_address: &str) -> Result<Option<MaskedMapping>, StoreError>;

    /// Flip a mapping to `Expired`. Re-expiring an already expired mapping
    /// is a no-op; an unknown address is [`StoreError::NotFound`].
    async fn expire(&self, masked_address: &str) -> Result<(), StoreError>;

    /// One page of still-`Active` mappings whose expiry has passed at `now`,
    /// ordered by expiry, at most `limit` entries. Callers drain by calling
    /// again after expiring the page; flipped mappings drop out of the set,
    /// so the loop terminates without a cursor.
    async fn list_expirable(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<MaskedMapping>, StoreError>;
}

pub mod memory;

pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
