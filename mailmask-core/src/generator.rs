// mailmask-core/src/generator.rs
use base64::prelude::*;
use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes per token. 16 bytes is 128 bits of entropy, which keeps
/// the address space unguessable and makes collisions a non-event in
/// practice; the create path still handles them as a hard error.
const TOKEN_BYTES: usize = 16;

/// Source of candidate masked addresses.
///
/// The request service only ever asks for "one more candidate", so tests
/// can drive it with fixed or failing sources.
pub trait AddressSource: Send + Sync {
    /// Produce one candidate masked address.
    fn generate(&self) -> String;
}

/// OS-randomness generator: URL-safe base64 token at a fixed domain.
pub struct AddressGenerator {
    domain: String,
}

impl AddressGenerator {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl AddressSource for AddressGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = BASE64_URL_SAFE_NO_PAD.encode(bytes);
        format!("{token}@{}", self.domain)
    }
}
