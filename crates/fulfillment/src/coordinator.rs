//! Orchestrates booking intake and completion against the catalog and
//! partner notification fan-out.

use std::sync::Arc;

use common::AggregateId;
use domain::aggregate::Aggregate;
use domain::booking::{Booking, BookingService, CompleteBooking, CreateBooking, LineItem};
use domain::command::CommandResult;
use event_store::EventStore;

use crate::dispatcher::{NotificationDispatcher, NotificationKind, NotificationLog};
use crate::error::{FulfillmentError, Result};
use crate::services::{CatalogDirectory, PartnerDirectory, PushSender, StockLedger};

/// Front door for booking intake and fulfillment side effects.
///
/// The booking state machine itself lives in the domain crate; the
/// coordinator adds what surrounds it: catalog validation before intake,
/// partner fan-out after, and stock decrements once a booking completes.
pub struct FulfillmentCoordinator<S, C, P, L, Push>
where
    S: EventStore,
{
    bookings: Arc<BookingService<S>>,
    catalog: Arc<C>,
    dispatcher: NotificationDispatcher<P, L, Push>,
}

impl<S, C, P, L, Push> FulfillmentCoordinator<S, C, P, L, Push>
where
    S: EventStore,
    C: CatalogDirectory + StockLedger,
    P: PartnerDirectory,
    L: NotificationLog,
    Push: PushSender,
{
    /// Creates a new coordinator.
    pub fn new(
        bookings: Arc<BookingService<S>>,
        catalog: Arc<C>,
        dispatcher: NotificationDispatcher<P, L, Push>,
    ) -> Self {
        Self {
            bookings,
            catalog,
            dispatcher,
        }
    }

    /// Returns the underlying booking service.
    pub fn bookings(&self) -> &BookingService<S> {
        &self.bookings
    }

    /// Takes in a cash-on-delivery booking.
    ///
    /// Every line item must reference a known product. Partner fan-out
    /// happens after the booking is persisted and never fails the intake.
    #[tracing::instrument(skip(self, cmd))]
    pub async fn intake_cod(&self, cmd: CreateBooking) -> Result<CommandResult<Booking>> {
        self.validate_items(&cmd.items).await?;

        let result = self.bookings.create_cod(cmd).await?;

        if let (Some(booking_id), Some(sequence_id)) =
            (result.aggregate.id(), result.aggregate.sequence_id())
        {
            self.dispatcher
                .notify(NotificationKind::CodBooking, booking_id, sequence_id.clone())
                .await;
        }

        Ok(result)
    }

    /// Completes a booking and decrements stock for its line items.
    ///
    /// The state transition commits first; stock is only touched once the
    /// booking is durably completed. A ledger failure after that point is
    /// traced, not surfaced, since the completion already happened.
    #[tracing::instrument(skip(self))]
    pub async fn complete_booking(&self, booking_id: AggregateId) -> Result<CommandResult<Booking>> {
        let result = self
            .bookings
            .complete(CompleteBooking::new(booking_id))
            .await?;

        for item in result.aggregate.items() {
            match self.catalog.decrement(&item.product_id, item.quantity).await {
                Ok(level) => {
                    tracing::debug!(
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        level,
                        "Stock decremented"
                    );
                }
                Err(error) => {
                    // The completion event is already committed; a ledger
                    // failure here must not roll it back or fail the caller.
                    tracing::warn!(product_id = %item.product_id, %error, "Stock decrement failed");
                    metrics::counter!("stock_decrement_failures_total").increment(1);
                }
            }
        }

        Ok(result)
    }

    /// Notifies on-duty partners about a booking created from a verified
    /// payment. Used by the reconciler; best-effort like all fan-out.
    pub(crate) async fn notify_paid(&self, booking: &Booking) {
        if let (Some(booking_id), Some(sequence_id)) = (booking.id(), booking.sequence_id()) {
            self.dispatcher
                .notify(NotificationKind::PaidBooking, booking_id, sequence_id.clone())
                .await;
        }
    }

    pub(crate) async fn validate_items(&self, items: &[LineItem]) -> Result<()> {
        for item in items {
            if !self.catalog.exists(&item.product_id).await? {
                return Err(FulfillmentError::InvalidProduct {
                    product_id: item.product_id.to_string(),
                });
            }
        }
        Ok(())
    }
}
