//! Payment gateway trait and in-memory implementation.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::booking::Money;

use crate::error::FulfillmentError;

/// A freshly opened gateway payment intent.
#[derive(Debug, Clone)]
pub struct GatewayIntent {
    /// The order id the gateway assigned to this intent.
    pub gateway_order_id: String,
}

/// Trait for the payment gateway's server-side API.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment intent for the given amount.
    async fn create_intent(
        &self,
        amount: Money,
        currency: &str,
    ) -> Result<GatewayIntent, FulfillmentError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    next_id: u32,
    fail_on_create: bool,
    delay: Option<Duration>,
}

/// In-memory payment gateway for testing, handing out sequential order ids.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail intent creation.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures an artificial delay before intent creation completes.
    pub fn set_delay(&self, delay: Duration) {
        self.state.write().unwrap().delay = Some(delay);
    }

    /// Returns the number of intents opened so far.
    pub fn intent_count(&self) -> u32 {
        self.state.read().unwrap().next_id
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_intent(
        &self,
        _amount: Money,
        _currency: &str,
    ) -> Result<GatewayIntent, FulfillmentError> {
        let delay = self.state.read().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().unwrap();
        if state.fail_on_create {
            return Err(FulfillmentError::Gateway(
                "intent creation refused".to_string(),
            ));
        }

        state.next_id += 1;
        Ok(GatewayIntent {
            gateway_order_id: format!("order_{:04}", state.next_id),
        })
    }
}
