//! Partner directory trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::booking::PartnerId;

use crate::error::FulfillmentError;

/// A delivery partner as the notification fan-out sees them.
#[derive(Debug, Clone)]
pub struct Partner {
    /// The partner's unique id.
    pub id: PartnerId,
    /// Display name.
    pub name: String,
    /// Whether the partner is currently on duty.
    pub on_duty: bool,
    /// Push token for the partner's device, if registered.
    pub push_token: Option<String>,
}

impl Partner {
    pub fn new(id: PartnerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            on_duty: true,
            push_token: None,
        }
    }

    pub fn with_push_token(mut self, token: impl Into<String>) -> Self {
        self.push_token = Some(token.into());
        self
    }

    pub fn off_duty(mut self) -> Self {
        self.on_duty = false;
        self
    }
}

/// Trait for looking up delivery partners.
#[async_trait]
pub trait PartnerDirectory: Send + Sync {
    /// Returns all partners currently on duty.
    async fn on_duty_partners(&self) -> Result<Vec<Partner>, FulfillmentError>;
}

/// In-memory partner directory for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPartnerDirectory {
    partners: Arc<RwLock<Vec<Partner>>>,
}

impl InMemoryPartnerDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a partner to the directory.
    pub fn with_partner(self, partner: Partner) -> Self {
        self.add_partner(partner);
        self
    }

    /// Adds a partner to the directory.
    pub fn add_partner(&self, partner: Partner) {
        self.partners.write().unwrap().push(partner);
    }

    /// Returns the total number of partners, on duty or not.
    pub fn partner_count(&self) -> usize {
        self.partners.read().unwrap().len()
    }
}

#[async_trait]
impl PartnerDirectory for InMemoryPartnerDirectory {
    async fn on_duty_partners(&self) -> Result<Vec<Partner>, FulfillmentError> {
        Ok(self
            .partners
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.on_duty)
            .cloned()
            .collect())
    }
}
