//! Per-customer bookings read model with guest-email merge.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::SequenceId;
use domain::booking::{BookingEvent, BookingStatus, CustomerId, DeliveryStatus, Money};
use event_store::EventEnvelope;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// A booking as a customer sees it.
#[derive(Debug, Clone)]
pub struct CustomerBookingSummary {
    pub booking_id: AggregateId,
    pub sequence_id: SequenceId,
    pub customer_id: Option<CustomerId>,
    pub contact_email: String,
    pub status: BookingStatus,
    pub delivery_status: DeliveryStatus,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
}

/// Read model for a customer's own bookings.
///
/// Bookings placed while logged out carry no owner; they are indexed by
/// contact email so account queries can merge them in, and so the claim
/// endpoint can find which guest bookings to attach to an account.
#[derive(Clone)]
pub struct CustomerBookingsView {
    bookings: Arc<RwLock<HashMap<AggregateId, CustomerBookingSummary>>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl CustomerBookingsView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self {
            bookings: Arc::new(RwLock::new(HashMap::new())),
            position: Arc::new(RwLock::new(ProjectionPosition::zero())),
        }
    }

    /// Gets a customer's bookings, merged with guest bookings placed under
    /// the same email, newest first.
    pub async fn bookings_for_customer(
        &self,
        customer_id: CustomerId,
        email: &str,
    ) -> Vec<CustomerBookingSummary> {
        let bookings = self.bookings.read().await;
        let mut result: Vec<CustomerBookingSummary> = bookings
            .values()
            .filter(|b| {
                b.customer_id == Some(customer_id)
                    || (b.customer_id.is_none() && b.contact_email.eq_ignore_ascii_case(email))
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result
    }

    /// Gets the ids of unowned bookings placed under an email.
    ///
    /// The claim endpoint feeds these to `attach_owner`.
    pub async fn guest_booking_ids_for_email(&self, email: &str) -> Vec<AggregateId> {
        self.bookings
            .read()
            .await
            .values()
            .filter(|b| b.customer_id.is_none() && b.contact_email.eq_ignore_ascii_case(email))
            .map(|b| b.booking_id)
            .collect()
    }

    async fn apply(&self, booking_id: AggregateId, event: BookingEvent) {
        let mut bookings = self.bookings.write().await;

        match event {
            BookingEvent::BookingCreated(data) => {
                bookings.insert(
                    booking_id,
                    CustomerBookingSummary {
                        booking_id,
                        sequence_id: data.sequence_id,
                        customer_id: data.customer_id,
                        contact_email: data.contact.email,
                        status: data.status,
                        delivery_status: data.delivery_status,
                        total_amount: data.total_amount,
                        created_at: data.created_at,
                    },
                );
            }
            BookingEvent::BookingPicked(_) => {
                if let Some(booking) = bookings.get_mut(&booking_id) {
                    booking.status = BookingStatus::Picked;
                    booking.delivery_status = DeliveryStatus::OutForDelivery;
                }
            }
            BookingEvent::BookingConfirmed(_) => {
                if let Some(booking) = bookings.get_mut(&booking_id) {
                    booking.status = BookingStatus::Confirmed;
                    booking.delivery_status = DeliveryStatus::Processing;
                }
            }
            BookingEvent::BookingCompleted(_) => {
                if let Some(booking) = bookings.get_mut(&booking_id) {
                    booking.status = BookingStatus::Completed;
                    booking.delivery_status = DeliveryStatus::Delivered;
                }
            }
            BookingEvent::BookingRejected(_) => {
                if let Some(booking) = bookings.get_mut(&booking_id) {
                    booking.status = BookingStatus::Rejected;
                    booking.delivery_status = DeliveryStatus::Cancelled;
                }
            }
            BookingEvent::BookingCancelled(_) => {
                if let Some(booking) = bookings.get_mut(&booking_id) {
                    booking.status = BookingStatus::Cancelled;
                    booking.delivery_status = DeliveryStatus::Cancelled;
                }
            }
            BookingEvent::OwnerAttached(data) => {
                if let Some(booking) = bookings.get_mut(&booking_id) {
                    booking.customer_id = Some(data.customer_id);
                }
            }
            BookingEvent::BookingAmended(data) => {
                if let Some(booking) = bookings.get_mut(&booking_id) {
                    if let Some(status) = data.status {
                        booking.status = status;
                    }
                    if let Some(delivery_status) = data.delivery_status {
                        booking.delivery_status = delivery_status;
                    }
                }
            }
        }
    }
}

impl Default for CustomerBookingsView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for CustomerBookingsView {
    fn name(&self) -> &'static str {
        "CustomerBookingsView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type == "Booking" {
            let booking_event: BookingEvent = serde_json::from_value(event.payload.clone())?;
            self.apply(event.aggregate_id, booking_event).await;
        }

        let mut pos = self.position.write().await;
        *pos = pos.advance();

        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        self.bookings.write().await.clear();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for CustomerBookingsView {
    fn name(&self) -> &'static str {
        "CustomerBookingsView"
    }

    fn count(&self) -> usize {
        self.bookings.try_read().map(|b| b.len()).unwrap_or(0)
    }
}
