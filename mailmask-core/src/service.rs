// mailmask-core/src/service.rs
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use mask_store::{address, MappingStore, Plan, StoreError};

use crate::error::ServiceError;
use crate::generator::AddressSource;

/// Generation attempts before giving up on a collision streak.
const MAX_GENERATE_ATTEMPTS: u32 = 5;

/// Turns "mask this address under this plan" requests into stored mappings.
pub struct MaskingService {
    store: Arc<dyn MappingStore>,
    source: Arc<dyn AddressSource>,
}

impl MaskingService {
    pub fn new(store: Arc<dyn MappingStore>, source: Arc<dyn AddressSource>) -> Self {
        Self { store, source }
    }

    /// Create a masked address that forwards to `real_email` under `plan`.
    ///
    /// Input is validated before any candidate is generated, so malformed
    /// requests cost no entropy and no store write. Returns the masked
    /// address alone; the binding itself stays internal.
    pub async fn create_masked(&self, real_email: &str, plan: &str) -> Result<String, ServiceError> {
        let plan = Plan::from_str(plan).map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        address::validate(real_email)
            .map_err(|e| ServiceError::InvalidInput(format!("invalid real address: {e}")))?;

        for attempt in 1..=MAX_GENERATE_ATTEMPTS {
            let candidate = self.source.generate();
            match self.store.create(&candidate, real_email, plan, Utc::now()).await {
                Ok(mapping) => {
                    tracing::info!(
                        masked = %mapping.masked_address,
                        plan = plan.as_str(),
                        "masked address created"
                    );
                    return Ok(mapping.masked_address);
                }
                Err(StoreError::DuplicateAddress) => {
                    tracing::warn!(attempt, "masked address collided, regenerating");
                }
                Err(StoreError::InvalidRealAddress(e)) => {
                    return Err(ServiceError::InvalidInput(format!(
                        "invalid real address: {e}"
                    )));
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::error!(
            attempts = MAX_GENERATE_ATTEMPTS,
            "masked address generation exhausted; entropy source or store needs attention"
        );
        Err(ServiceError::GenerationExhausted {
            attempts: MAX_GENERATE_ATTEMPTS,
        })
    }
}
