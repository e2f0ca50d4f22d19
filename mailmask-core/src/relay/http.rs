// mailmask-core/src/relay/http.rs
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{InboundMessage, MailTransport, RelayError};

/// Relay adapter that POSTs handoffs to an HTTP mail-transport endpoint.
pub struct HttpRelay {
    inner: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpRelay {
    /// Build a relay client with a bounded per-handoff timeout, so a stuck
    /// upstream can't pin inbound handling forever.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError {
                status: None,
                message: e.to_string(),
            })?;
        Ok(Self {
            inner,
            endpoint: endpoint.into(),
            bearer_token: None,
        })
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.bearer_token = Some(token);
        self
    }
}

#[async_trait]
impl MailTransport for HttpRelay {
    async fn relay(&self, to: &str, message: &InboundMessage) -> Result<(), RelayError> {
        let mut req = self.inner.post(&self.endpoint);

        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }

        let body = json!({
            "to": to,
            "from": message.from,
            "subject": message.subject,
            "body": message.body,
        });

        let resp = req.json(&body).send().await.map_err(|e| RelayError {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(RelayError {
                status: Some(status.as_u16()),
                message: text,
            });
        }

        Ok(())
    }
}
