// mask-store/src/lib.rs
pub mod address;
pub mod error;
pub mod store;
pub mod types;

pub use address::AddressError;
pub use error::StoreError;
pub use store::{MappingStore, MemoryStore};
pub use types::{MaskedMapping, MappingStatus, Plan, UnknownPlan, UnknownStatus};

// Re-export the SQLite store when the feature is enabled
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
