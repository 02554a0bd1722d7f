//! Booking domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::sequence::SequenceId;

use super::{
    BookingStatus, Contact, CustomerId, DeliveryStatus, LineItem, Money, PartnerId, PaymentMethod,
};

/// Events that can occur on a booking aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BookingEvent {
    /// Booking was taken in.
    BookingCreated(BookingCreatedData),

    /// A delivery partner claimed the booking.
    BookingPicked(BookingPickedData),

    /// Booking was confirmed.
    BookingConfirmed(BookingConfirmedData),

    /// Booking was fulfilled.
    BookingCompleted(BookingCompletedData),

    /// Booking was rejected by staff.
    BookingRejected(BookingRejectedData),

    /// Booking was cancelled.
    BookingCancelled(BookingCancelledData),

    /// A guest booking was reconciled to a registered customer.
    OwnerAttached(OwnerAttachedData),

    /// An admin overrode booking fields, bypassing the state machine guards.
    BookingAmended(BookingAmendedData),
}

impl DomainEvent for BookingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::BookingCreated(_) => "BookingCreated",
            BookingEvent::BookingPicked(_) => "BookingPicked",
            BookingEvent::BookingConfirmed(_) => "BookingConfirmed",
            BookingEvent::BookingCompleted(_) => "BookingCompleted",
            BookingEvent::BookingRejected(_) => "BookingRejected",
            BookingEvent::BookingCancelled(_) => "BookingCancelled",
            BookingEvent::OwnerAttached(_) => "OwnerAttached",
            BookingEvent::BookingAmended(_) => "BookingAmended",
        }
    }
}

/// Data for BookingCreated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreatedData {
    /// The unique booking ID.
    pub booking_id: AggregateId,

    /// The external, human-readable id.
    pub sequence_id: SequenceId,

    /// The owning customer, if the booking was placed by a registered account.
    pub customer_id: Option<CustomerId>,

    /// Delivery contact.
    pub contact: Contact,

    /// Line items ordered.
    pub items: Vec<LineItem>,

    /// Total amount in minor units.
    pub total_amount: Money,

    /// How the booking is paid.
    pub payment_method: PaymentMethod,

    /// Status the booking starts in (COD intake is configurable,
    /// gateway-paid bookings start confirmed).
    pub status: BookingStatus,

    /// Delivery status the booking starts in. Older payloads omitted this
    /// field; absent values normalize to `pending`.
    #[serde(default)]
    pub delivery_status: DeliveryStatus,

    /// When the booking was taken in.
    pub created_at: DateTime<Utc>,
}

/// Data for BookingPicked event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingPickedData {
    /// The partner who claimed the booking.
    pub partner_id: PartnerId,

    /// When the claim happened.
    pub picked_at: DateTime<Utc>,
}

/// Data for BookingConfirmed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmedData {
    /// The partner confirming, if the actor was a partner.
    pub confirmed_by: Option<PartnerId>,

    /// When the booking was confirmed.
    pub confirmed_at: DateTime<Utc>,
}

/// Data for BookingCompleted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCompletedData {
    /// When the booking was fulfilled.
    pub completed_at: DateTime<Utc>,
}

/// Data for BookingRejected event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRejectedData {
    /// When the booking was rejected.
    pub rejected_at: DateTime<Utc>,
}

/// Data for BookingCancelled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCancelledData {
    /// Reason for cancellation.
    pub reason: String,

    /// Who cancelled the booking.
    pub cancelled_by: Option<String>,

    /// When the booking was cancelled.
    pub cancelled_at: DateTime<Utc>,
}

/// Data for OwnerAttached event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerAttachedData {
    /// The customer the booking now belongs to.
    pub customer_id: CustomerId,

    /// When the reconciliation happened.
    pub attached_at: DateTime<Utc>,
}

/// Data for BookingAmended event. `None` fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingAmendedData {
    /// New booking status, if overridden.
    pub status: Option<BookingStatus>,

    /// New delivery status, if overridden.
    pub delivery_status: Option<DeliveryStatus>,

    /// New assignee, if overridden.
    pub assigned_to: Option<PartnerId>,

    /// When the override happened.
    pub amended_at: DateTime<Utc>,
}

// Convenience constructors for events
impl BookingEvent {
    /// Creates a BookingCreated event.
    #[allow(clippy::too_many_arguments)]
    pub fn booking_created(
        booking_id: AggregateId,
        sequence_id: SequenceId,
        customer_id: Option<CustomerId>,
        contact: Contact,
        items: Vec<LineItem>,
        total_amount: Money,
        payment_method: PaymentMethod,
        status: BookingStatus,
        delivery_status: DeliveryStatus,
    ) -> Self {
        BookingEvent::BookingCreated(BookingCreatedData {
            booking_id,
            sequence_id,
            customer_id,
            contact,
            items,
            total_amount,
            payment_method,
            status,
            delivery_status,
            created_at: Utc::now(),
        })
    }

    /// Creates a BookingPicked event.
    pub fn booking_picked(partner_id: PartnerId) -> Self {
        BookingEvent::BookingPicked(BookingPickedData {
            partner_id,
            picked_at: Utc::now(),
        })
    }

    /// Creates a BookingConfirmed event.
    pub fn booking_confirmed(confirmed_by: Option<PartnerId>) -> Self {
        BookingEvent::BookingConfirmed(BookingConfirmedData {
            confirmed_by,
            confirmed_at: Utc::now(),
        })
    }

    /// Creates a BookingCompleted event.
    pub fn booking_completed() -> Self {
        BookingEvent::BookingCompleted(BookingCompletedData {
            completed_at: Utc::now(),
        })
    }

    /// Creates a BookingRejected event.
    pub fn booking_rejected() -> Self {
        BookingEvent::BookingRejected(BookingRejectedData {
            rejected_at: Utc::now(),
        })
    }

    /// Creates a BookingCancelled event.
    pub fn booking_cancelled(reason: impl Into<String>, cancelled_by: Option<String>) -> Self {
        BookingEvent::BookingCancelled(BookingCancelledData {
            reason: reason.into(),
            cancelled_by,
            cancelled_at: Utc::now(),
        })
    }

    /// Creates an OwnerAttached event.
    pub fn owner_attached(customer_id: CustomerId) -> Self {
        BookingEvent::OwnerAttached(OwnerAttachedData {
            customer_id,
            attached_at: Utc::now(),
        })
    }

    /// Creates a BookingAmended event.
    pub fn booking_amended(
        status: Option<BookingStatus>,
        delivery_status: Option<DeliveryStatus>,
        assigned_to: Option<PartnerId>,
    ) -> Self {
        BookingEvent::BookingAmended(BookingAmendedData {
            status,
            delivery_status,
            assigned_to,
            amended_at: Utc::now(),
        })
    }
}
