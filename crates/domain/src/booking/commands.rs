//! Booking commands.

use common::AggregateId;

use crate::command::Command;

use super::{
    Booking, BookingStatus, Contact, CustomerId, DeliveryStatus, LineItem, Money, PartnerId,
};

/// Command to take in a new booking.
///
/// The payment method and initial statuses are supplied by the service:
/// COD intake and gateway-paid materialization start differently.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    /// The booking ID to create.
    pub booking_id: AggregateId,

    /// The customer placing the booking, absent for guests.
    pub customer_id: Option<CustomerId>,

    /// Delivery contact.
    pub contact: Contact,

    /// Line items ordered.
    pub items: Vec<LineItem>,

    /// Total amount in minor units.
    pub total_amount: Money,
}

impl CreateBooking {
    /// Creates a new CreateBooking command.
    pub fn new(
        customer_id: Option<CustomerId>,
        contact: Contact,
        items: Vec<LineItem>,
        total_amount: Money,
    ) -> Self {
        Self {
            booking_id: AggregateId::new(),
            customer_id,
            contact,
            items,
            total_amount,
        }
    }

    /// Sets an explicit booking ID.
    pub fn with_booking_id(mut self, booking_id: AggregateId) -> Self {
        self.booking_id = booking_id;
        self
    }
}

impl Command for CreateBooking {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Command for a partner to claim a booking.
#[derive(Debug, Clone)]
pub struct PickBooking {
    /// The booking to claim.
    pub booking_id: AggregateId,

    /// The claiming partner.
    pub partner_id: PartnerId,
}

impl PickBooking {
    /// Creates a new PickBooking command.
    pub fn new(booking_id: AggregateId, partner_id: PartnerId) -> Self {
        Self {
            booking_id,
            partner_id,
        }
    }
}

impl Command for PickBooking {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Command to confirm a booking.
#[derive(Debug, Clone)]
pub struct ConfirmBooking {
    /// The booking to confirm.
    pub booking_id: AggregateId,

    /// The confirming partner, if the actor is a partner.
    pub confirmed_by: Option<PartnerId>,
}

impl ConfirmBooking {
    /// Creates a new ConfirmBooking command.
    pub fn new(booking_id: AggregateId, confirmed_by: Option<PartnerId>) -> Self {
        Self {
            booking_id,
            confirmed_by,
        }
    }
}

impl Command for ConfirmBooking {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Command to complete a booking.
#[derive(Debug, Clone)]
pub struct CompleteBooking {
    /// The booking to complete.
    pub booking_id: AggregateId,
}

impl CompleteBooking {
    /// Creates a new CompleteBooking command.
    pub fn new(booking_id: AggregateId) -> Self {
        Self { booking_id }
    }
}

impl Command for CompleteBooking {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Command to reject a booking.
#[derive(Debug, Clone)]
pub struct RejectBooking {
    /// The booking to reject.
    pub booking_id: AggregateId,
}

impl RejectBooking {
    /// Creates a new RejectBooking command.
    pub fn new(booking_id: AggregateId) -> Self {
        Self { booking_id }
    }
}

impl Command for RejectBooking {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Command to cancel a booking.
#[derive(Debug, Clone)]
pub struct CancelBooking {
    /// The booking to cancel.
    pub booking_id: AggregateId,

    /// Reason for cancellation.
    pub reason: String,

    /// Who is cancelling the booking.
    pub cancelled_by: Option<String>,
}

impl CancelBooking {
    /// Creates a new CancelBooking command.
    pub fn new(
        booking_id: AggregateId,
        reason: impl Into<String>,
        cancelled_by: Option<String>,
    ) -> Self {
        Self {
            booking_id,
            reason: reason.into(),
            cancelled_by,
        }
    }
}

impl Command for CancelBooking {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Command to attach a registered customer to a guest booking.
#[derive(Debug, Clone)]
pub struct AttachOwner {
    /// The booking to reconcile.
    pub booking_id: AggregateId,

    /// The customer the booking belongs to.
    pub customer_id: CustomerId,
}

impl AttachOwner {
    /// Creates a new AttachOwner command.
    pub fn new(booking_id: AggregateId, customer_id: CustomerId) -> Self {
        Self {
            booking_id,
            customer_id,
        }
    }
}

impl Command for AttachOwner {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}

/// Command for an admin to override booking fields.
#[derive(Debug, Clone, Default)]
pub struct AdminUpdateBooking {
    /// The booking to override.
    pub booking_id: AggregateId,

    /// New booking status, if overridden.
    pub status: Option<BookingStatus>,

    /// New delivery status, if overridden.
    pub delivery_status: Option<DeliveryStatus>,

    /// New assignee, if overridden.
    pub assigned_to: Option<PartnerId>,
}

impl AdminUpdateBooking {
    /// Creates a new AdminUpdateBooking command with no overrides.
    pub fn new(booking_id: AggregateId) -> Self {
        Self {
            booking_id,
            ..Default::default()
        }
    }

    /// Overrides the booking status.
    pub fn status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Overrides the delivery status.
    pub fn delivery_status(mut self, delivery_status: DeliveryStatus) -> Self {
        self.delivery_status = Some(delivery_status);
        self
    }

    /// Overrides the assignee.
    pub fn assigned_to(mut self, partner_id: PartnerId) -> Self {
        self.assigned_to = Some(partner_id);
        self
    }
}

impl Command for AdminUpdateBooking {
    type Aggregate = Booking;

    fn aggregate_id(&self) -> AggregateId {
        self.booking_id
    }
}
