//! Payment record aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::aggregate::Aggregate;
use domain::booking::{Contact, CustomerId, LineItem, Money};
use event_store::Version;
use serde::{Deserialize, Serialize};

use super::{PaymentError, PaymentEvent, PaymentState};

/// Everything captured at intent time that is needed to create a booking
/// once the payment settles. Kept on the payment record so the callback
/// does not have to trust anything the client re-sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSnapshot {
    /// The owning customer, if the intent was placed by a registered account.
    pub customer_id: Option<CustomerId>,

    /// Delivery contact.
    pub contact: Contact,

    /// Line items ordered.
    pub items: Vec<LineItem>,

    /// Total amount in minor units.
    pub total_amount: Money,
}

/// The payment record aggregate.
///
/// A payment record is created when a gateway intent is opened and settles
/// exactly once: paid, failed, or errored. Its event log is the audit trail
/// for reconciliation; the CAS append on settlement is what makes duplicate
/// callbacks idempotent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payment {
    id: Option<AggregateId>,
    version: Version,
    gateway_order_id: Option<String>,
    amount: Money,
    currency: String,
    snapshot: Option<BookingSnapshot>,
    state: PaymentState,
    gateway_payment_id: Option<String>,
    booking_id: Option<AggregateId>,
    error_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl Aggregate for Payment {
    type Event = PaymentEvent;
    type Error = PaymentError;

    fn aggregate_type() -> &'static str {
        "Payment"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            PaymentEvent::PaymentInitiated(data) => {
                self.id = Some(data.payment_id);
                self.gateway_order_id = Some(data.gateway_order_id);
                self.amount = data.amount;
                self.currency = data.currency;
                self.snapshot = Some(data.snapshot);
                self.state = PaymentState::Created;
                self.created_at = Some(data.created_at);
            }
            PaymentEvent::PaymentVerified(data) => {
                self.state = PaymentState::Paid;
                self.gateway_payment_id = Some(data.gateway_payment_id);
                self.booking_id = Some(data.booking_id);
            }
            PaymentEvent::PaymentFailed(data) => {
                self.state = PaymentState::Failed;
                self.gateway_payment_id = data.gateway_payment_id;
            }
            PaymentEvent::PaymentErrored(data) => {
                self.state = PaymentState::Errored;
                self.error_reason = Some(data.reason);
            }
        }
    }
}

impl Payment {
    // Query methods

    pub fn gateway_order_id(&self) -> Option<&str> {
        self.gateway_order_id.as_deref()
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn snapshot(&self) -> Option<&BookingSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn state(&self) -> PaymentState {
        self.state
    }

    pub fn gateway_payment_id(&self) -> Option<&str> {
        self.gateway_payment_id.as_deref()
    }

    pub fn booking_id(&self) -> Option<AggregateId> {
        self.booking_id
    }

    pub fn error_reason(&self) -> Option<&str> {
        self.error_reason.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    // Command methods

    /// Opens the payment record for a newly created gateway intent.
    pub fn initiate(
        &self,
        payment_id: AggregateId,
        gateway_order_id: impl Into<String>,
        amount: Money,
        currency: impl Into<String>,
        snapshot: BookingSnapshot,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        if self.id.is_some() {
            return Err(PaymentError::AlreadyInitiated);
        }

        Ok(vec![PaymentEvent::payment_initiated(
            payment_id,
            gateway_order_id,
            amount,
            currency,
            snapshot,
        )])
    }

    /// Settles the record as paid. Only a pending record can settle.
    pub fn mark_paid(
        &self,
        gateway_payment_id: impl Into<String>,
        signature: impl Into<String>,
        booking_id: AggregateId,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        if !self.state.is_pending() {
            return Err(PaymentError::InvalidState {
                current_state: self.state,
                action: "mark paid",
            });
        }

        Ok(vec![PaymentEvent::payment_verified(
            gateway_payment_id,
            signature,
            booking_id,
        )])
    }

    /// Settles the record as failed. Only a pending record can settle.
    pub fn mark_failed(
        &self,
        gateway_payment_id: Option<String>,
        signature: Option<String>,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        if !self.state.is_pending() {
            return Err(PaymentError::InvalidState {
                current_state: self.state,
                action: "mark failed",
            });
        }

        Ok(vec![PaymentEvent::payment_failed(
            gateway_payment_id,
            signature,
        )])
    }

    /// Records a downstream failure. Allowed while pending, and also from
    /// Paid (the verification was appended but booking creation failed).
    pub fn mark_errored(
        &self,
        reason: impl Into<String>,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        if !matches!(self.state, PaymentState::Created | PaymentState::Paid) {
            return Err(PaymentError::InvalidState {
                current_state: self.state,
                action: "mark errored",
            });
        }

        Ok(vec![PaymentEvent::payment_errored(reason)])
    }
}
