//! Push sender trait and in-memory implementation.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FulfillmentError;

/// Trait for delivering push notifications to partner devices.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Sends a push message to the device identified by `token`.
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<(), FulfillmentError>;
}

/// A push message as recorded by the in-memory sender.
#[derive(Debug, Clone)]
pub struct SentPush {
    pub token: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct InMemoryPushState {
    sent: Vec<SentPush>,
    fail_on_send: bool,
    delay: Option<Duration>,
}

/// In-memory push sender for testing, with failure and latency injection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPushSender {
    state: Arc<RwLock<InMemoryPushState>>,
}

impl InMemoryPushSender {
    /// Creates a new in-memory push sender.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sender to fail every send call.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Configures an artificial delay before each send completes.
    pub fn set_delay(&self, delay: Duration) {
        self.state.write().unwrap().delay = Some(delay);
    }

    /// Returns all pushes delivered so far.
    pub fn sent(&self) -> Vec<SentPush> {
        self.state.read().unwrap().sent.clone()
    }

    /// Returns the number of pushes delivered so far.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }
}

#[async_trait]
impl PushSender for InMemoryPushSender {
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<(), FulfillmentError> {
        let (fail, delay) = {
            let state = self.state.read().unwrap();
            (state.fail_on_send, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fail {
            return Err(FulfillmentError::Gateway(format!(
                "push delivery to {token} failed"
            )));
        }

        self.state.write().unwrap().sent.push(SentPush {
            token: token.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_records_push() {
        let sender = InMemoryPushSender::new();

        sender.send("tok-1", "New booking", "Retrowoods-001").await.unwrap();

        assert_eq!(sender.sent_count(), 1);
        let sent = sender.sent();
        assert_eq!(sent[0].token, "tok-1");
        assert_eq!(sent[0].body, "Retrowoods-001");
    }

    #[tokio::test]
    async fn test_fail_on_send() {
        let sender = InMemoryPushSender::new();
        sender.set_fail_on_send(true);

        let result = sender.send("tok-1", "New booking", "Retrowoods-001").await;
        assert!(result.is_err());
        assert_eq!(sender.sent_count(), 0);
    }
}
