//! Payment record events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::aggregate::DomainEvent;
use domain::booking::Money;
use serde::{Deserialize, Serialize};

use super::BookingSnapshot;

/// Events that can occur on a payment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaymentEvent {
    /// A gateway intent was opened for a prospective booking.
    PaymentInitiated(PaymentInitiatedData),

    /// The reconciliation callback carried a valid signature.
    PaymentVerified(PaymentVerifiedData),

    /// The reconciliation callback was rejected or reported failure.
    PaymentFailed(PaymentFailedData),

    /// Verification succeeded but the booking could not be created.
    PaymentErrored(PaymentErroredData),
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentInitiated(_) => "PaymentInitiated",
            PaymentEvent::PaymentVerified(_) => "PaymentVerified",
            PaymentEvent::PaymentFailed(_) => "PaymentFailed",
            PaymentEvent::PaymentErrored(_) => "PaymentErrored",
        }
    }
}

/// Data for PaymentInitiated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInitiatedData {
    /// The payment record's own id.
    pub payment_id: AggregateId,

    /// The order id the gateway handed back.
    pub gateway_order_id: String,

    /// Amount the intent was opened for, in minor units.
    pub amount: Money,

    /// ISO currency code.
    pub currency: String,

    /// Everything needed to create the booking once payment settles.
    pub snapshot: BookingSnapshot,

    /// When the intent was opened.
    pub created_at: DateTime<Utc>,
}

/// Data for PaymentVerified event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerifiedData {
    /// The gateway's payment id from the callback.
    pub gateway_payment_id: String,

    /// The signature that was verified.
    pub signature: String,

    /// Id of the booking created for this payment.
    pub booking_id: AggregateId,

    /// When verification succeeded.
    pub verified_at: DateTime<Utc>,
}

/// Data for PaymentFailed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedData {
    /// The gateway's payment id, if the callback carried one.
    pub gateway_payment_id: Option<String>,

    /// The signature that was presented, if any.
    pub signature: Option<String>,

    /// When the failure was recorded.
    pub failed_at: DateTime<Utc>,
}

/// Data for PaymentErrored event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentErroredData {
    /// What went wrong downstream.
    pub reason: String,

    /// When the error was recorded.
    pub errored_at: DateTime<Utc>,
}

impl PaymentEvent {
    /// Creates a PaymentInitiated event.
    pub fn payment_initiated(
        payment_id: AggregateId,
        gateway_order_id: impl Into<String>,
        amount: Money,
        currency: impl Into<String>,
        snapshot: BookingSnapshot,
    ) -> Self {
        PaymentEvent::PaymentInitiated(PaymentInitiatedData {
            payment_id,
            gateway_order_id: gateway_order_id.into(),
            amount,
            currency: currency.into(),
            snapshot,
            created_at: Utc::now(),
        })
    }

    /// Creates a PaymentVerified event.
    pub fn payment_verified(
        gateway_payment_id: impl Into<String>,
        signature: impl Into<String>,
        booking_id: AggregateId,
    ) -> Self {
        PaymentEvent::PaymentVerified(PaymentVerifiedData {
            gateway_payment_id: gateway_payment_id.into(),
            signature: signature.into(),
            booking_id,
            verified_at: Utc::now(),
        })
    }

    /// Creates a PaymentFailed event.
    pub fn payment_failed(gateway_payment_id: Option<String>, signature: Option<String>) -> Self {
        PaymentEvent::PaymentFailed(PaymentFailedData {
            gateway_payment_id,
            signature,
            failed_at: Utc::now(),
        })
    }

    /// Creates a PaymentErrored event.
    pub fn payment_errored(reason: impl Into<String>) -> Self {
        PaymentEvent::PaymentErrored(PaymentErroredData {
            reason: reason.into(),
            errored_at: Utc::now(),
        })
    }
}
