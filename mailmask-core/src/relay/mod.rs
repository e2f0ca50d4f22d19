// mailmask-core/src/relay/mod.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error from a relay handoff
#[derive(Debug, Clone)]
pub struct RelayError {
    pub status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(status) = self.status {
            write!(f, "relay error {}: {}", status, self.message)
        } else {
            write!(f, "relay error: {}", self.message)
        }
    }
}

impl std::error::Error for RelayError {}

/// An inbound message addressed to a masked address.
///
/// Only what forwarding needs: envelope sender, optional subject, body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundMessage {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
}

/// Downstream transport that takes over delivery.
///
/// Forwarding ends at a successful handoff; whether the transport then
/// delivers, queues or bounces is its own business.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Hand `message` off for delivery to `to` (the resolved real address).
    async fn relay(&self, to: &str, message: &InboundMessage) -> Result<(), RelayError>;
}

/// Transport that logs the handoff instead of performing it. Default when
/// no relay endpoint is configured, so a fresh install can't leak mail to
/// a half-configured upstream.
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn relay(&self, to: &str, message: &InboundMessage) -> Result<(), RelayError> {
        tracing::info!(to = %to, from = %message.from, "relay handoff (log transport, not delivered)");
        Ok(())
    }
}

#[cfg(feature = "reqwest")]
pub mod http;

#[cfg(feature = "reqwest")]
pub use http::HttpRelay;
