// mailmask-core/src/forward.rs
use std::sync::Arc;

use chrono::Utc;
use mask_store::{MappingStatus, MappingStore};

use crate::error::ForwardError;
use crate::relay::{InboundMessage, MailTransport};

/// Outcome of handling one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardResult {
    /// Handed off to the transport for the resolved real address.
    Relayed { real_address: String },
    /// Mapping exists but its lifetime has passed; dropped.
    DroppedExpired,
    /// Nothing bound to the address; dropped.
    DroppedUnknown,
}

/// Resolves inbound mail against the mapping store and relays or drops.
pub struct ForwardingEngine {
    store: Arc<dyn MappingStore>,
    transport: Arc<dyn MailTransport>,
}

impl ForwardingEngine {
    pub fn new(store: Arc<dyn MappingStore>, transport: Arc<dyn MailTransport>) -> Self {
        Self { store, transport }
    }

    /// Handle one inbound message addressed to `masked_address`.
    ///
    /// The expiry timestamp is re-checked here rather than trusting the
    /// stored status, so a lagging sweep can never let a message through
    /// past the mapping's lifetime.
    pub async fn handle_inbound(
        &self,
        masked_address: &str,
        message: &InboundMessage,
    ) -> Result<ForwardResult, ForwardError> {
        let Some(mapping) = self.store.lookup(masked_address).await? else {
            tracing::info!(masked = %masked_address, "dropping inbound for unknown masked address");
            return Ok(ForwardResult::DroppedUnknown);
        };

        if mapping.is_expired_at(Utc::now()) {
            if mapping.status == MappingStatus::Active {
                // Flip the record off the fast path. Best effort only: the
                // drop decision is already made, and the sweeper picks the
                // mapping up if this write loses a race or fails.
                let store = Arc::clone(&self.store);
                let address = masked_address.to_string();
                tokio::spawn(async move {
                    if let Err(err) = store.expire(&address).await {
                        tracing::debug!(masked = %address, error = %err, "post-drop expire failed");
                    }
                });
            }
            tracing::info!(masked = %masked_address, "dropping inbound for expired masked address");
            return Ok(ForwardResult::DroppedExpired);
        }

        self.transport.relay(&mapping.real_address, message).await?;
        tracing::info!(masked = %masked_address, "inbound relayed");
        Ok(ForwardResult::Relayed {
            real_address: mapping.real_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayError;
    use async_trait::async_trait;
    use chrono::Duration;
    use mask_store::{MemoryStore, Plan};
    use std::sync::Mutex;

    /// Records every handoff instead of delivering.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, InboundMessage)>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn relay(&self, to: &str, message: &InboundMessage) -> Result<(), RelayError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), message.clone()));
            Ok(())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl MailTransport for FailingTransport {
        async fn relay(&self, _to: &str, _message: &InboundMessage) -> Result<(), RelayError> {
            Err(RelayError {
                status: Some(503),
                message: "upstream unavailable".to_string(),
            })
        }
    }

    fn message() -> InboundMessage {
        InboundMessage {
            from: "sender@elsewhere.net".to_string(),
            subject: Some("hello".to_string()),
            body: "hi".to_string(),
        }
    }

    fn engine_with(
        store: Arc<MemoryStore>,
        transport: Arc<RecordingTransport>,
    ) -> ForwardingEngine {
        ForwardingEngine::new(store, transport)
    }

    #[tokio::test]
    async fn test_unknown_address_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let engine = engine_with(Arc::clone(&store), Arc::clone(&transport));

        let result = engine
            .handle_inbound("ghost@mask.test", &message())
            .await
            .unwrap();

        assert_eq!(result, ForwardResult::DroppedUnknown);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_mapping_is_relayed() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let engine = engine_with(Arc::clone(&store), Arc::clone(&transport));

        // Created an hour ago on the free plan: 23 hours of life left.
        store
            .create(
                "tok@mask.test",
                "real@example.com",
                Plan::Free,
                Utc::now() - Duration::hours(1),
            )
            .await
            .unwrap();

        let result = engine
            .handle_inbound("tok@mask.test", &message())
            .await
            .unwrap();

        assert_eq!(
            result,
            ForwardResult::Relayed {
                real_address: "real@example.com".to_string()
            }
        );
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "real@example.com");
        assert_eq!(sent[0].1, message());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_active_mapping_is_dropped_and_retired() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let engine = engine_with(Arc::clone(&store), Arc::clone(&transport));

        // 25 hours old on the free plan: past expiry, status still Active
        // because no sweep has run.
        store
            .create(
                "tok@mask.test",
                "real@example.com",
                Plan::Free,
                Utc::now() - Duration::hours(25),
            )
            .await
            .unwrap();

        let result = engine
            .handle_inbound("tok@mask.test", &message())
            .await
            .unwrap();

        assert_eq!(result, ForwardResult::DroppedExpired);
        assert!(transport.sent.lock().unwrap().is_empty());

        // Let the spawned expire write land.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let mapping = store.lookup("tok@mask.test").await.unwrap().unwrap();
        assert_eq!(mapping.status, MappingStatus::Expired);
    }

    #[tokio::test]
    async fn test_swept_mapping_is_dropped_without_rewrite() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let engine = engine_with(Arc::clone(&store), Arc::clone(&transport));

        // Status Expired wins even though the timestamp is still in the
        // future (an operator or earlier bug could have flipped it).
        store
            .create("tok@mask.test", "real@example.com", Plan::Premium, Utc::now())
            .await
            .unwrap();
        store.expire("tok@mask.test").await.unwrap();

        let result = engine
            .handle_inbound("tok@mask.test", &message())
            .await
            .unwrap();

        assert_eq!(result, ForwardResult::DroppedExpired);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_relay_failure_propagates() {
        let store = Arc::new(MemoryStore::new());
        let engine = ForwardingEngine::new(store.clone(), Arc::new(FailingTransport));

        store
            .create("tok@mask.test", "real@example.com", Plan::Free, Utc::now())
            .await
            .unwrap();

        let err = engine
            .handle_inbound("tok@mask.test", &message())
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::Relay(_)));

        // The mapping is untouched; a later attempt may still succeed.
        let mapping = store.lookup("tok@mask.test").await.unwrap().unwrap();
        assert_eq!(mapping.status, MappingStatus::Active);
    }
}
