// mask-store/src/store/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::MappingStore;
use crate::address;
use crate::error::StoreError;
use crate::types::{MaskedMapping, MappingStatus, Plan};

/// In-memory mapping store.
///
/// Backed by a `HashMap` behind an `RwLock`; the write guard makes the
/// occupancy check and insert a single atomic step. Nothing survives a
/// restart, which makes this the test double and the throwaway-deploy
/// backend, not the durable one.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<String, MaskedMapping>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mappings held, any status.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn create(
        &self,
        masked_address: &str,
        real_address: &str,
        plan: Plan,
        now: DateTime<Utc>,
    ) -> Result<MaskedMapping, StoreError> {
        address::validate(real_address)?;
        let mapping = MaskedMapping::new(masked_address, real_address, plan, now);

        let mut guard = self.inner.write();
        if guard.contains_key(masked_address) {
            return Err(StoreError::DuplicateAddress);
        }
        guard.insert(masked_address.to_string(), mapping.clone());
        Ok(mapping)
    }

    async fn lookup(&self, masked_address: &str) -> Result<Option<MaskedMapping>, StoreError> {
        Ok(self.inner.read().get(masked_address).cloned())
    }

    async fn expire(&self, masked_address: &str) -> Result<(), StoreError> {
        match self.inner.write().get_mut(masked_address) {
            Some(mapping) => {
                mapping.status = MappingStatus::Expired;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn list_expirable(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<MaskedMapping>, StoreError> {
        let mut due: Vec<MaskedMapping> = self
            .inner
            .read()
            .values()
            .filter(|m| m.status == MappingStatus::Active && m.expires_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|m| m.expires_at);
        due.truncate(limit as usize);
        Ok(due)
    }
}
