//! Booking directory read model — every booking with its linked payment.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::SequenceId;
use domain::booking::{
    BookingEvent, BookingStatus, Contact, CustomerId, DeliveryStatus, LineItem, Money, PartnerId,
    PaymentMethod,
};
use event_store::EventEnvelope;
use fulfillment::{PaymentEvent, PaymentState};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// A booking as the directory sees it.
#[derive(Debug, Clone)]
pub struct BookingDetails {
    pub booking_id: AggregateId,
    pub sequence_id: SequenceId,
    pub customer_id: Option<CustomerId>,
    pub contact: Contact,
    pub items: Vec<LineItem>,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub status: BookingStatus,
    pub delivery_status: DeliveryStatus,
    pub assigned_to: Option<PartnerId>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A payment record as the directory sees it.
#[derive(Debug, Clone)]
pub struct PaymentSummary {
    pub payment_record_id: AggregateId,
    pub gateway_order_id: String,
    pub amount: Money,
    pub state: PaymentState,
    pub booking_id: Option<AggregateId>,
}

/// A directory entry: the booking joined with its payment, if any.
#[derive(Debug, Clone)]
pub struct BookingRecord {
    pub booking: BookingDetails,
    pub payment: Option<PaymentSummary>,
}

#[derive(Default)]
struct DirectoryState {
    bookings: HashMap<AggregateId, BookingDetails>,
    payments: HashMap<AggregateId, PaymentSummary>,
    payment_by_booking: HashMap<AggregateId, AggregateId>,
}

/// Read model view over all bookings, joined with their payment records.
///
/// Backs the admin listing and the single-booking read. The join happens at
/// query time, so it is insensitive to payment events arriving before the
/// booking they reference (which is the normal order for paid bookings).
#[derive(Clone)]
pub struct BookingDirectoryView {
    state: Arc<RwLock<DirectoryState>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl BookingDirectoryView {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState::default())),
            position: Arc::new(RwLock::new(ProjectionPosition::zero())),
        }
    }

    /// Gets a booking with its linked payment.
    pub async fn get_booking(&self, booking_id: AggregateId) -> Option<BookingRecord> {
        let state = self.state.read().await;
        let booking = state.bookings.get(&booking_id)?.clone();
        let payment = state
            .payment_by_booking
            .get(&booking_id)
            .and_then(|payment_id| state.payments.get(payment_id))
            .cloned();
        Some(BookingRecord { booking, payment })
    }

    /// Gets all bookings, newest first.
    pub async fn all_bookings(&self) -> Vec<BookingRecord> {
        let state = self.state.read().await;
        let mut records: Vec<BookingRecord> = state
            .bookings
            .values()
            .map(|booking| {
                let payment = state
                    .payment_by_booking
                    .get(&booking.booking_id)
                    .and_then(|payment_id| state.payments.get(payment_id))
                    .cloned();
                BookingRecord {
                    booking: booking.clone(),
                    payment,
                }
            })
            .collect();
        records.sort_by(|a, b| b.booking.created_at.cmp(&a.booking.created_at));
        records
    }

    /// Gets bookings in a given status, newest first.
    pub async fn bookings_by_status(&self, status: BookingStatus) -> Vec<BookingRecord> {
        let mut records = self.all_bookings().await;
        records.retain(|r| r.booking.status == status);
        records
    }

    /// Gets a payment record by its id.
    pub async fn get_payment(&self, payment_record_id: AggregateId) -> Option<PaymentSummary> {
        self.state
            .read()
            .await
            .payments
            .get(&payment_record_id)
            .cloned()
    }

    /// Drops a booking from the directory.
    ///
    /// Used by the explicit delete path; the event log keeps the booking's
    /// history, only the directory entry goes away. A full rebuild restores
    /// it. Returns false if the booking was not present.
    pub async fn remove_booking(&self, booking_id: AggregateId) -> bool {
        let mut state = self.state.write().await;
        state.payment_by_booking.remove(&booking_id);
        state.bookings.remove(&booking_id).is_some()
    }

    async fn apply_booking_event(&self, booking_id: AggregateId, event: BookingEvent) {
        let mut state = self.state.write().await;

        match event {
            BookingEvent::BookingCreated(data) => {
                state.bookings.insert(
                    booking_id,
                    BookingDetails {
                        booking_id,
                        sequence_id: data.sequence_id,
                        customer_id: data.customer_id,
                        contact: data.contact,
                        items: data.items,
                        total_amount: data.total_amount,
                        payment_method: data.payment_method,
                        status: data.status,
                        delivery_status: data.delivery_status,
                        assigned_to: None,
                        cancel_reason: None,
                        created_at: data.created_at,
                        updated_at: data.created_at,
                    },
                );
            }
            BookingEvent::BookingPicked(data) => {
                if let Some(booking) = state.bookings.get_mut(&booking_id) {
                    booking.status = BookingStatus::Picked;
                    booking.delivery_status = DeliveryStatus::OutForDelivery;
                    booking.assigned_to = Some(data.partner_id);
                    booking.updated_at = data.picked_at;
                }
            }
            BookingEvent::BookingConfirmed(data) => {
                if let Some(booking) = state.bookings.get_mut(&booking_id) {
                    booking.status = BookingStatus::Confirmed;
                    booking.delivery_status = DeliveryStatus::Processing;
                    if booking.assigned_to.is_none() {
                        booking.assigned_to = data.confirmed_by;
                    }
                    booking.updated_at = data.confirmed_at;
                }
            }
            BookingEvent::BookingCompleted(data) => {
                if let Some(booking) = state.bookings.get_mut(&booking_id) {
                    booking.status = BookingStatus::Completed;
                    booking.delivery_status = DeliveryStatus::Delivered;
                    booking.updated_at = data.completed_at;
                }
            }
            BookingEvent::BookingRejected(data) => {
                if let Some(booking) = state.bookings.get_mut(&booking_id) {
                    booking.status = BookingStatus::Rejected;
                    booking.delivery_status = DeliveryStatus::Cancelled;
                    booking.updated_at = data.rejected_at;
                }
            }
            BookingEvent::BookingCancelled(data) => {
                if let Some(booking) = state.bookings.get_mut(&booking_id) {
                    booking.status = BookingStatus::Cancelled;
                    booking.delivery_status = DeliveryStatus::Cancelled;
                    booking.cancel_reason = Some(data.reason);
                    booking.updated_at = data.cancelled_at;
                }
            }
            BookingEvent::OwnerAttached(data) => {
                if let Some(booking) = state.bookings.get_mut(&booking_id) {
                    booking.customer_id = Some(data.customer_id);
                    booking.updated_at = data.attached_at;
                }
            }
            BookingEvent::BookingAmended(data) => {
                if let Some(booking) = state.bookings.get_mut(&booking_id) {
                    if let Some(status) = data.status {
                        booking.status = status;
                    }
                    if let Some(delivery_status) = data.delivery_status {
                        booking.delivery_status = delivery_status;
                    }
                    if let Some(assigned_to) = data.assigned_to {
                        booking.assigned_to = Some(assigned_to);
                    }
                    booking.updated_at = data.amended_at;
                }
            }
        }
    }

    async fn apply_payment_event(&self, payment_id: AggregateId, event: PaymentEvent) {
        let mut state = self.state.write().await;

        match event {
            PaymentEvent::PaymentInitiated(data) => {
                state.payments.insert(
                    payment_id,
                    PaymentSummary {
                        payment_record_id: payment_id,
                        gateway_order_id: data.gateway_order_id,
                        amount: data.amount,
                        state: PaymentState::Created,
                        booking_id: None,
                    },
                );
            }
            PaymentEvent::PaymentVerified(data) => {
                if let Some(payment) = state.payments.get_mut(&payment_id) {
                    payment.state = PaymentState::Paid;
                    payment.booking_id = Some(data.booking_id);
                }
                state.payment_by_booking.insert(data.booking_id, payment_id);
            }
            PaymentEvent::PaymentFailed(_) => {
                if let Some(payment) = state.payments.get_mut(&payment_id) {
                    payment.state = PaymentState::Failed;
                }
            }
            PaymentEvent::PaymentErrored(_) => {
                if let Some(payment) = state.payments.get_mut(&payment_id) {
                    payment.state = PaymentState::Errored;
                }
            }
        }
    }
}

impl Default for BookingDirectoryView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for BookingDirectoryView {
    fn name(&self) -> &'static str {
        "BookingDirectoryView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        match event.aggregate_type.as_str() {
            "Booking" => {
                let booking_event: BookingEvent = serde_json::from_value(event.payload.clone())?;
                self.apply_booking_event(event.aggregate_id, booking_event)
                    .await;
            }
            "Payment" => {
                let payment_event: PaymentEvent = serde_json::from_value(event.payload.clone())?;
                self.apply_payment_event(event.aggregate_id, payment_event)
                    .await;
            }
            _ => {}
        }

        let mut pos = self.position.write().await;
        *pos = pos.advance();

        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = DirectoryState::default();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for BookingDirectoryView {
    fn name(&self) -> &'static str {
        "BookingDirectoryView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.bookings.len()).unwrap_or(0)
    }
}
