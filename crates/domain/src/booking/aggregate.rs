//! Booking aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::sequence::SequenceId;

use super::{
    BookingError, BookingEvent, BookingStatus, Contact, CustomerId, DeliveryStatus, LineItem,
    Money, PartnerId, PaymentMethod,
    events::{BookingAmendedData, BookingCreatedData},
};

/// Booking aggregate root.
///
/// Represents one customer order through its full lifecycle from intake to
/// completion, cancellation, or rejection. Every transition is produced as an
/// event and committed with the version observed at load time, so concurrent
/// transitions on the same booking cannot both win.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier.
    id: Option<AggregateId>,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    /// External human-readable id (e.g. `Retrowoods-042`).
    sequence_id: Option<SequenceId>,

    /// Owning customer, absent for guest bookings.
    customer_id: Option<CustomerId>,

    /// Delivery contact captured at intake.
    contact: Contact,

    /// Line items ordered.
    items: Vec<LineItem>,

    /// Total amount in minor units.
    total_amount: Money,

    /// How the booking is paid.
    payment_method: Option<PaymentMethod>,

    /// Current booking status.
    status: BookingStatus,

    /// Current delivery status.
    delivery_status: DeliveryStatus,

    /// Partner the booking is assigned to, if claimed.
    assigned_to: Option<PartnerId>,

    /// Reason recorded on cancellation.
    cancel_reason: Option<String>,

    /// When the booking was taken in.
    created_at: Option<DateTime<Utc>>,
}

impl Aggregate for Booking {
    type Event = BookingEvent;
    type Error = BookingError;

    fn aggregate_type() -> &'static str {
        "Booking"
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
            BookingEvent::BookingCreated(data) => self.apply_created(data),
            BookingEvent::BookingPicked(data) => {
                self.assigned_to = Some(data.partner_id);
                self.status = BookingStatus::Picked;
                self.delivery_status = DeliveryStatus::OutForDelivery;
            }
            BookingEvent::BookingConfirmed(data) => {
                if self.assigned_to.is_none() {
                    self.assigned_to = data.confirmed_by;
                }
                self.status = BookingStatus::Confirmed;
                self.delivery_status = DeliveryStatus::Processing;
            }
            BookingEvent::BookingCompleted(_) => {
                self.status = BookingStatus::Completed;
                self.delivery_status = DeliveryStatus::Delivered;
            }
            BookingEvent::BookingRejected(_) => {
                self.status = BookingStatus::Rejected;
                self.delivery_status = DeliveryStatus::Cancelled;
            }
            BookingEvent::BookingCancelled(data) => {
                self.status = BookingStatus::Cancelled;
                self.delivery_status = DeliveryStatus::Cancelled;
                self.cancel_reason = Some(data.reason);
            }
            BookingEvent::OwnerAttached(data) => {
                self.customer_id = Some(data.customer_id);
            }
            BookingEvent::BookingAmended(data) => self.apply_amended(data),
        }
    }
}

// Query methods
impl Booking {
    /// Returns the external sequence id.
    pub fn sequence_id(&self) -> Option<&SequenceId> {
        self.sequence_id.as_ref()
    }

    /// Returns the owning customer, if any.
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    /// Returns the delivery contact.
    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    /// Returns the line items.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns the total amount.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Returns the payment method.
    pub fn payment_method(&self) -> Option<&PaymentMethod> {
        self.payment_method.as_ref()
    }

    /// Returns the current booking status.
    pub fn status(&self) -> BookingStatus {
        self.status
    }

    /// Returns the current delivery status.
    pub fn delivery_status(&self) -> DeliveryStatus {
        self.delivery_status
    }

    /// Returns the partner the booking is assigned to.
    pub fn assigned_to(&self) -> Option<PartnerId> {
        self.assigned_to
    }

    /// Returns the recorded cancellation reason.
    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    /// Returns when the booking was taken in.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns true if the booking is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Command methods (return events)
impl Booking {
    /// Takes in a new booking.
    ///
    /// Validates line items (non-empty, quantities at least 1), the total
    /// (positive), and the contact (required fields present). The initial
    /// status is supplied by the caller: COD intake is a configuration
    /// choice, gateway-paid bookings always start confirmed.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        booking_id: AggregateId,
        sequence_id: SequenceId,
        customer_id: Option<CustomerId>,
        contact: Contact,
        items: Vec<LineItem>,
        total_amount: Money,
        payment_method: PaymentMethod,
        status: BookingStatus,
        delivery_status: DeliveryStatus,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        self.validate_intake(&contact, &items, total_amount)?;

        Ok(vec![BookingEvent::booking_created(
            booking_id,
            sequence_id,
            customer_id,
            contact,
            items,
            total_amount,
            payment_method,
            status,
            delivery_status,
        )])
    }

    /// Checks intake input without producing events.
    ///
    /// The service runs this before allocating a sequence id, so a rejected
    /// intake never consumes a number.
    pub fn validate_intake(
        &self,
        contact: &Contact,
        items: &[LineItem],
        total_amount: Money,
    ) -> Result<(), BookingError> {
        if self.id.is_some() {
            return Err(BookingError::AlreadyCreated);
        }

        if items.is_empty() {
            return Err(BookingError::NoItems);
        }

        for item in items {
            if item.quantity == 0 {
                return Err(BookingError::InvalidQuantity {
                    quantity: item.quantity,
                });
            }
        }

        if !total_amount.is_positive() {
            return Err(BookingError::InvalidTotal {
                cents: total_amount.cents(),
            });
        }

        contact.validate()
    }

    /// Claims the booking for a delivery partner.
    ///
    /// Legal only from `pending` with no assignee. An already assigned
    /// booking fails with `AlreadyClaimed` regardless of status.
    pub fn pick(&self, partner_id: PartnerId) -> Result<Vec<BookingEvent>, BookingError> {
        if self.assigned_to.is_some() {
            return Err(BookingError::AlreadyClaimed);
        }

        if !self.status.can_pick() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.status,
                action: "pick",
            });
        }

        Ok(vec![BookingEvent::booking_picked(partner_id)])
    }

    /// Confirms the booking.
    ///
    /// A confirming partner becomes the assignee if the booking has none.
    pub fn confirm(
        &self,
        confirmed_by: Option<PartnerId>,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.status.can_confirm() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.status,
                action: "confirm",
            });
        }

        Ok(vec![BookingEvent::booking_confirmed(confirmed_by)])
    }

    /// Completes the booking.
    pub fn complete(&self) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.status.can_complete() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.status,
                action: "complete",
            });
        }

        Ok(vec![BookingEvent::booking_completed()])
    }

    /// Rejects the booking.
    pub fn reject(&self) -> Result<Vec<BookingEvent>, BookingError> {
        if !self.status.can_reject() {
            return Err(BookingError::InvalidStateTransition {
                current_state: self.status,
                action: "reject",
            });
        }

        Ok(vec![BookingEvent::booking_rejected()])
    }

    /// Cancels the booking.
    ///
    /// Completed bookings stay completed; the attempt fails with
    /// `AlreadyCompleted` and the booking is left unmodified.
    pub fn cancel(
        &self,
        reason: impl Into<String>,
        cancelled_by: Option<String>,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        if self.status == BookingStatus::Completed {
            return Err(BookingError::AlreadyCompleted);
        }

        Ok(vec![BookingEvent::booking_cancelled(reason, cancelled_by)])
    }

    /// Attaches a registered customer as the booking's owner.
    ///
    /// No-op (no events) if the booking already has an owner.
    pub fn attach_owner(&self, customer_id: CustomerId) -> Result<Vec<BookingEvent>, BookingError> {
        if self.customer_id.is_some() {
            return Ok(vec![]);
        }

        Ok(vec![BookingEvent::owner_attached(customer_id)])
    }

    /// Overrides booking fields without state-machine guards (admin only).
    ///
    /// Returns no events when every field is `None`.
    pub fn admin_update(
        &self,
        status: Option<BookingStatus>,
        delivery_status: Option<DeliveryStatus>,
        assigned_to: Option<PartnerId>,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        if status.is_none() && delivery_status.is_none() && assigned_to.is_none() {
            return Ok(vec![]);
        }

        Ok(vec![BookingEvent::booking_amended(
            status,
            delivery_status,
            assigned_to,
        )])
    }
}

// Apply event helpers
impl Booking {
    fn apply_created(&mut self, data: BookingCreatedData) {
        self.id = Some(data.booking_id);
        self.sequence_id = Some(data.sequence_id);
        self.customer_id = data.customer_id;
        self.contact = data.contact;
        self.items = data.items;
        self.total_amount = data.total_amount;
        self.payment_method = Some(data.payment_method);
        self.status = data.status;
        self.delivery_status = data.delivery_status;
        self.created_at = Some(data.created_at);
    }

    fn apply_amended(&mut self, data: BookingAmendedData) {
        if let Some(status) = data.status {
            self.status = status;
        }
        if let Some(delivery_status) = data.delivery_status {
            self.delivery_status = delivery_status;
        }
        if let Some(assigned_to) = data.assigned_to {
            self.assigned_to = Some(assigned_to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregate, DomainEvent};

    fn items() -> Vec<LineItem> {
        vec![LineItem::new(
            "SKU-001",
            "Pine Shelf",
            2,
            Money::from_cents(1000),
        )]
    }

    fn contact() -> Contact {
        Contact::new("Ada", "ada@example.com", "555-0100", "1 Main St")
    }

    fn create_booking(status: BookingStatus) -> (Booking, AggregateId) {
        let mut booking = Booking::default();
        let booking_id = AggregateId::new();
        let events = booking
            .create(
                booking_id,
                SequenceId::new("Retrowoods-001"),
                None,
                contact(),
                items(),
                Money::from_cents(2000),
                PaymentMethod::Cod,
                status,
                DeliveryStatus::Pending,
            )
            .unwrap();
        booking.apply_events(events);
        (booking, booking_id)
    }

    #[test]
    fn test_create_booking() {
        let (booking, booking_id) = create_booking(BookingStatus::Pending);
        assert_eq!(booking.id(), Some(booking_id));
        assert_eq!(booking.sequence_id().unwrap().as_str(), "Retrowoods-001");
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.delivery_status(), DeliveryStatus::Pending);
        assert_eq!(booking.total_amount().cents(), 2000);
        assert!(booking.assigned_to().is_none());
    }

    #[test]
    fn test_create_twice_fails() {
        let (booking, _) = create_booking(BookingStatus::Pending);
        let result = booking.create(
            AggregateId::new(),
            SequenceId::new("Retrowoods-002"),
            None,
            contact(),
            items(),
            Money::from_cents(2000),
            PaymentMethod::Cod,
            BookingStatus::Pending,
            DeliveryStatus::Pending,
        );
        assert!(matches!(result, Err(BookingError::AlreadyCreated)));
    }

    #[test]
    fn test_create_without_items_fails() {
        let booking = Booking::default();
        let result = booking.create(
            AggregateId::new(),
            SequenceId::new("Retrowoods-001"),
            None,
            contact(),
            vec![],
            Money::from_cents(2000),
            PaymentMethod::Cod,
            BookingStatus::Pending,
            DeliveryStatus::Pending,
        );
        assert!(matches!(result, Err(BookingError::NoItems)));
    }

    #[test]
    fn test_create_with_zero_quantity_fails() {
        let booking = Booking::default();
        let result = booking.create(
            AggregateId::new(),
            SequenceId::new("Retrowoods-001"),
            None,
            contact(),
            vec![LineItem::new(
                "SKU-001",
                "Pine Shelf",
                0,
                Money::from_cents(1000),
            )],
            Money::from_cents(2000),
            PaymentMethod::Cod,
            BookingStatus::Pending,
            DeliveryStatus::Pending,
        );
        assert!(matches!(
            result,
            Err(BookingError::InvalidQuantity { quantity: 0 })
        ));
    }

    #[test]
    fn test_create_with_zero_total_fails() {
        let booking = Booking::default();
        let result = booking.create(
            AggregateId::new(),
            SequenceId::new("Retrowoods-001"),
            None,
            contact(),
            items(),
            Money::zero(),
            PaymentMethod::Cod,
            BookingStatus::Pending,
            DeliveryStatus::Pending,
        );
        assert!(matches!(result, Err(BookingError::InvalidTotal { .. })));
    }

    #[test]
    fn test_create_with_missing_contact_fails() {
        let booking = Booking::default();
        let result = booking.create(
            AggregateId::new(),
            SequenceId::new("Retrowoods-001"),
            None,
            Contact::new("", "ada@example.com", "555-0100", "1 Main St"),
            items(),
            Money::from_cents(2000),
            PaymentMethod::Cod,
            BookingStatus::Pending,
            DeliveryStatus::Pending,
        );
        assert!(matches!(
            result,
            Err(BookingError::MissingContact { field: "name" })
        ));
    }

    #[test]
    fn test_pick_assigns_partner_and_moves_out_for_delivery() {
        let (mut booking, _) = create_booking(BookingStatus::Pending);
        let partner = PartnerId::new();

        let events = booking.pick(partner).unwrap();
        assert_eq!(events[0].event_type(), "BookingPicked");
        booking.apply_events(events);

        assert_eq!(booking.status(), BookingStatus::Picked);
        assert_eq!(booking.delivery_status(), DeliveryStatus::OutForDelivery);
        assert_eq!(booking.assigned_to(), Some(partner));
    }

    #[test]
    fn test_pick_claimed_booking_fails() {
        let (mut booking, _) = create_booking(BookingStatus::Pending);
        booking.apply_events(booking.pick(PartnerId::new()).unwrap());

        let result = booking.pick(PartnerId::new());
        assert!(matches!(result, Err(BookingError::AlreadyClaimed)));
    }

    #[test]
    fn test_pick_confirmed_booking_fails() {
        let (booking, _) = create_booking(BookingStatus::Confirmed);
        let result = booking.pick(PartnerId::new());
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_confirm_from_pending() {
        let (mut booking, _) = create_booking(BookingStatus::Pending);
        booking.apply_events(booking.confirm(None).unwrap());

        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert_eq!(booking.delivery_status(), DeliveryStatus::Processing);
    }

    #[test]
    fn test_confirm_by_partner_assigns() {
        let (mut booking, _) = create_booking(BookingStatus::Pending);
        let partner = PartnerId::new();
        booking.apply_events(booking.confirm(Some(partner)).unwrap());

        assert_eq!(booking.assigned_to(), Some(partner));
    }

    #[test]
    fn test_confirm_keeps_existing_assignee() {
        let (mut booking, _) = create_booking(BookingStatus::Pending);
        let first = PartnerId::new();
        booking.apply_events(booking.pick(first).unwrap());
        booking.apply_events(booking.confirm(Some(PartnerId::new())).unwrap());

        assert_eq!(booking.assigned_to(), Some(first));
    }

    #[test]
    fn test_complete_from_confirmed() {
        let (mut booking, _) = create_booking(BookingStatus::Confirmed);
        booking.apply_events(booking.complete().unwrap());

        assert_eq!(booking.status(), BookingStatus::Completed);
        assert_eq!(booking.delivery_status(), DeliveryStatus::Delivered);
        assert!(booking.is_terminal());
    }

    #[test]
    fn test_complete_from_picked() {
        let (mut booking, _) = create_booking(BookingStatus::Pending);
        booking.apply_events(booking.pick(PartnerId::new()).unwrap());
        booking.apply_events(booking.complete().unwrap());

        assert_eq!(booking.status(), BookingStatus::Completed);
    }

    #[test]
    fn test_complete_from_pending_fails() {
        let (booking, _) = create_booking(BookingStatus::Pending);
        let result = booking.complete();
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_complete_twice_fails() {
        let (mut booking, _) = create_booking(BookingStatus::Confirmed);
        booking.apply_events(booking.complete().unwrap());

        let result = booking.complete();
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_reject_non_terminal() {
        let (mut booking, _) = create_booking(BookingStatus::Pending);
        booking.apply_events(booking.reject().unwrap());

        assert_eq!(booking.status(), BookingStatus::Rejected);
        assert_eq!(booking.delivery_status(), DeliveryStatus::Cancelled);
    }

    #[test]
    fn test_reject_completed_fails() {
        let (mut booking, _) = create_booking(BookingStatus::Confirmed);
        booking.apply_events(booking.complete().unwrap());

        let result = booking.reject();
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_records_reason() {
        let (mut booking, _) = create_booking(BookingStatus::Pending);
        booking.apply_events(
            booking
                .cancel("changed mind", Some("customer".to_string()))
                .unwrap(),
        );

        assert_eq!(booking.status(), BookingStatus::Cancelled);
        assert_eq!(booking.delivery_status(), DeliveryStatus::Cancelled);
        assert_eq!(booking.cancel_reason(), Some("changed mind"));
    }

    #[test]
    fn test_cancel_completed_fails_unmodified() {
        let (mut booking, _) = create_booking(BookingStatus::Confirmed);
        booking.apply_events(booking.complete().unwrap());

        let result = booking.cancel("too late", None);
        assert!(matches!(result, Err(BookingError::AlreadyCompleted)));
        assert_eq!(booking.status(), BookingStatus::Completed);
        assert_eq!(booking.delivery_status(), DeliveryStatus::Delivered);
    }

    #[test]
    fn test_attach_owner_to_guest_booking() {
        let (mut booking, _) = create_booking(BookingStatus::Pending);
        let customer = CustomerId::new();
        booking.apply_events(booking.attach_owner(customer).unwrap());

        assert_eq!(booking.customer_id(), Some(customer));
    }

    #[test]
    fn test_attach_owner_noop_when_owned() {
        let (mut booking, _) = create_booking(BookingStatus::Pending);
        let customer = CustomerId::new();
        booking.apply_events(booking.attach_owner(customer).unwrap());

        let events = booking.attach_owner(CustomerId::new()).unwrap();
        assert!(events.is_empty());
        assert_eq!(booking.customer_id(), Some(customer));
    }

    #[test]
    fn test_admin_update_bypasses_guards() {
        let (mut booking, _) = create_booking(BookingStatus::Confirmed);
        booking.apply_events(booking.complete().unwrap());

        // Completed is terminal for guarded transitions, not for overrides.
        let events = booking
            .admin_update(Some(BookingStatus::Pending), Some(DeliveryStatus::Pending), None)
            .unwrap();
        booking.apply_events(events);

        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.delivery_status(), DeliveryStatus::Pending);
    }

    #[test]
    fn test_admin_update_with_no_fields_is_noop() {
        let (booking, _) = create_booking(BookingStatus::Pending);
        let events = booking.admin_update(None, None, None).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_serialization_round_trip() {
        let (mut booking, booking_id) = create_booking(BookingStatus::Pending);
        booking.apply_events(booking.pick(PartnerId::new()).unwrap());

        let json = serde_json::to_string(&booking).unwrap();
        let deserialized: Booking = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.id(), Some(booking_id));
        assert_eq!(deserialized.status(), BookingStatus::Picked);
        assert_eq!(deserialized.delivery_status(), DeliveryStatus::OutForDelivery);
    }
}
