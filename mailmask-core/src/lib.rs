// mailmask-core/src/lib.rs
pub mod config;
pub mod error;
pub mod forward;
pub mod generator;
pub mod relay;
pub mod service;
pub mod sweeper;

pub use config::{Config, RelayConfig};
pub use error::{ForwardError, ServiceError};
pub use forward::{ForwardResult, ForwardingEngine};
pub use generator::{AddressGenerator, AddressSource};
pub use relay::{InboundMessage, LogTransport, MailTransport, RelayError};
pub use service::MaskingService;
pub use sweeper::Sweeper;

// Re-export the HTTP relay when the feature is enabled
#[cfg(feature = "reqwest")]
pub use relay::HttpRelay;
