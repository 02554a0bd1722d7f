//! Booking service providing a simplified API for booking operations.

use std::sync::Arc;

use common::AggregateId;
use event_store::{EventStore, EventStoreError};

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::sequence::SequenceAllocator;

use super::{
    AdminUpdateBooking, AttachOwner, Booking, BookingError, BookingStatus, CancelBooking,
    CodInitialStatus, CompleteBooking, ConfirmBooking, CreateBooking, DeliveryStatus,
    PaymentMethod, PickBooking, RejectBooking,
};

impl From<BookingError> for DomainError {
    fn from(e: BookingError) -> Self {
        DomainError::Booking(e)
    }
}

/// Service for managing bookings.
///
/// Wraps the command handler, allocates sequence ids on intake, and maps
/// append-time conflicts on `pick` to the claim-race error. Transition
/// commands require an existing booking and fail with `AggregateNotFound`
/// otherwise.
pub struct BookingService<S: EventStore> {
    handler: CommandHandler<S, Booking>,
    sequence: Arc<dyn SequenceAllocator>,
    cod_initial_status: CodInitialStatus,
}

impl<S: EventStore> BookingService<S> {
    /// Creates a new booking service.
    pub fn new(
        store: S,
        sequence: Arc<dyn SequenceAllocator>,
        cod_initial_status: CodInitialStatus,
    ) -> Self {
        Self {
            handler: CommandHandler::new(store),
            sequence,
            cod_initial_status,
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Booking> {
        &self.handler
    }

    /// Takes in a cash-on-delivery booking.
    ///
    /// Allocates a sequence id; the initial status is the configured COD
    /// intake status, delivery starts pending.
    #[tracing::instrument(skip(self))]
    pub async fn create_cod(
        &self,
        cmd: CreateBooking,
    ) -> Result<CommandResult<Booking>, DomainError> {
        self.create_with(
            cmd,
            PaymentMethod::Cod,
            self.cod_initial_status.booking_status(),
            DeliveryStatus::Pending,
        )
        .await
    }

    /// Materializes a booking from a verified gateway payment.
    ///
    /// Starts confirmed with delivery processing, payment method set to the
    /// gateway name.
    #[tracing::instrument(skip(self))]
    pub async fn create_paid(
        &self,
        cmd: CreateBooking,
        gateway: impl Into<String> + std::fmt::Debug,
    ) -> Result<CommandResult<Booking>, DomainError> {
        self.create_with(
            cmd,
            PaymentMethod::Gateway(gateway.into()),
            BookingStatus::Confirmed,
            DeliveryStatus::Processing,
        )
        .await
    }

    async fn create_with(
        &self,
        cmd: CreateBooking,
        payment_method: PaymentMethod,
        status: BookingStatus,
        delivery_status: DeliveryStatus,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let booking_id = cmd.booking_id;

        let result = self
            .handler
            .execute(booking_id, |booking| {
                // Allocate the sequence id only after validation, so a
                // rejected intake never consumes a number.
                booking.validate_intake(&cmd.contact, &cmd.items, cmd.total_amount)?;
                let sequence_id = self.sequence.next();

                booking.create(
                    booking_id,
                    sequence_id,
                    cmd.customer_id,
                    cmd.contact,
                    cmd.items,
                    cmd.total_amount,
                    payment_method,
                    status,
                    delivery_status,
                )
            })
            .await?;

        metrics::counter!("bookings_created_total").increment(1);
        Ok(result)
    }

    /// Claims a booking for a partner.
    ///
    /// At most one concurrent claimer wins. A loser whose append conflicts
    /// re-reads the booking once; if it was indeed claimed the caller sees
    /// `AlreadyClaimed`, otherwise the conflict surfaces as-is.
    #[tracing::instrument(skip(self))]
    pub async fn pick(&self, cmd: PickBooking) -> Result<CommandResult<Booking>, DomainError> {
        let partner_id = cmd.partner_id;

        let result = self
            .handler
            .execute_existing(cmd.booking_id, |booking| booking.pick(partner_id))
            .await;

        match result {
            Err(DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. })) => {
                let booking = self.handler.load(cmd.booking_id).await?;
                if booking.assigned_to().is_some() {
                    Err(DomainError::Booking(BookingError::AlreadyClaimed))
                } else {
                    result
                }
            }
            other => {
                if other.is_ok() {
                    metrics::counter!("booking_transitions_total", "transition" => "pick")
                        .increment(1);
                }
                other
            }
        }
    }

    /// Confirms a booking.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(
        &self,
        cmd: ConfirmBooking,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let confirmed_by = cmd.confirmed_by;

        let result = self
            .handler
            .execute_existing(cmd.booking_id, |booking| booking.confirm(confirmed_by))
            .await?;

        metrics::counter!("booking_transitions_total", "transition" => "confirm").increment(1);
        Ok(result)
    }

    /// Completes a booking.
    ///
    /// Only the state transition; the completion orchestrator handles stock
    /// decrements after the transition has committed.
    #[tracing::instrument(skip(self))]
    pub async fn complete(
        &self,
        cmd: CompleteBooking,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let result = self
            .handler
            .execute_existing(cmd.booking_id, |booking| booking.complete())
            .await?;

        metrics::counter!("booking_transitions_total", "transition" => "complete").increment(1);
        Ok(result)
    }

    /// Rejects a booking.
    #[tracing::instrument(skip(self))]
    pub async fn reject(&self, cmd: RejectBooking) -> Result<CommandResult<Booking>, DomainError> {
        let result = self
            .handler
            .execute_existing(cmd.booking_id, |booking| booking.reject())
            .await?;

        metrics::counter!("booking_transitions_total", "transition" => "reject").increment(1);
        Ok(result)
    }

    /// Cancels a booking.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, cmd: CancelBooking) -> Result<CommandResult<Booking>, DomainError> {
        let reason = cmd.reason.clone();
        let cancelled_by = cmd.cancelled_by.clone();

        let result = self
            .handler
            .execute_existing(cmd.booking_id, |booking| {
                booking.cancel(reason, cancelled_by)
            })
            .await?;

        metrics::counter!("booking_transitions_total", "transition" => "cancel").increment(1);
        Ok(result)
    }

    /// Attaches a registered customer to a guest booking.
    #[tracing::instrument(skip(self))]
    pub async fn attach_owner(
        &self,
        cmd: AttachOwner,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let customer_id = cmd.customer_id;

        self.handler
            .execute_existing(cmd.booking_id, |booking| booking.attach_owner(customer_id))
            .await
    }

    /// Overrides booking fields without state-machine guards (admin only).
    #[tracing::instrument(skip(self))]
    pub async fn admin_update(
        &self,
        cmd: AdminUpdateBooking,
    ) -> Result<CommandResult<Booking>, DomainError> {
        self.handler
            .execute_existing(cmd.booking_id, |booking| {
                booking.admin_update(cmd.status, cmd.delivery_status, cmd.assigned_to)
            })
            .await
    }

    /// Loads a booking by ID.
    ///
    /// Returns None if the booking doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_booking(
        &self,
        booking_id: AggregateId,
    ) -> Result<Option<Booking>, DomainError> {
        self.handler.load_existing(booking_id).await
    }
}
