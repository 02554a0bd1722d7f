//! Fulfillment error types.

use common::AggregateId;
use domain::DomainError;
use event_store::EventStoreError;
use thiserror::Error;

use crate::payment::PaymentError;

/// Errors that can occur during fulfillment operations.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// A line item references a product the catalog does not know.
    #[error("Invalid product: {product_id}")]
    InvalidProduct { product_id: String },

    /// No payment record matches the callback.
    #[error("Payment not found: {0}")]
    PaymentNotFound(AggregateId),

    /// The callback signature did not match the expected keyed hash.
    #[error("Payment signature mismatch")]
    SignatureMismatch,

    /// The payment gateway failed or timed out.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// Payment record error.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Event store error.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
